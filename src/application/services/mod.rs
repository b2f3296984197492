//! Business logic services

mod billing;
mod charge_point;
mod device;

pub use billing::BillingService;
pub use charge_point::{ChargePointService, StartOutcome, StopOutcome};
pub use device::{DeviceCredentials, DeviceService};
