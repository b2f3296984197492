//! Device provisioning DTOs
//!
//! Snake_case on the wire; these endpoints are consumed by
//! provisioning tooling and the MQTT broker's auth hook, not by
//! chargers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterDeviceRequest {
    #[validate(length(min = 1, max = 64))]
    pub serial_number: String,
    #[validate(length(min = 1, max = 16))]
    pub device_type_code: String,
    /// Type-wide master secret; falls back to the configured default.
    pub master_secret: Option<String>,
}

/// Connect material for a provisioned device.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceCredentialsResponse {
    pub serial_number: String,
    pub device_type_code: String,
    pub mqtt_client_id: String,
    pub mqtt_username: String,
    /// 12-character derived password.
    pub mqtt_password: String,
    pub mqtt_broker_host: String,
    pub mqtt_broker_port: u16,
    pub is_active: bool,
}

/// Broker authentication callback body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeviceAuthRequest {
    pub client_id: String,
    pub username: String,
    pub password: String,
}
