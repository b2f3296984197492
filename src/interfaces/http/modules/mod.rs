pub mod chargers;
pub mod devices;
pub mod health;
pub mod ocpp_control;
