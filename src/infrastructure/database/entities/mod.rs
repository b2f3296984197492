//! SeaORM entity definitions

pub mod charge_point;
pub mod charging_session;
pub mod device;
pub mod device_event;
pub mod evse;
pub mod evse_status;
pub mod id_tag;
pub mod meter_value;
pub mod order;
pub mod site;
pub mod tariff;
