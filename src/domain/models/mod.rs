//! Domain entity models

mod billing;
mod charge_point;
mod device;
mod session;
mod site;

pub use billing::{Order, Tariff};
pub use charge_point::{ChargePoint, Evse, EvseState, EvseStatus, RegistrationState, STATION_EVSE_ID};
pub use device::{Device, DeviceEvent, DeviceEventType, IdTag};
pub use session::{ChargingSession, MeterValueSample, SessionStatus};
pub use site::Site;
