//! GetConfiguration command

use std::time::Duration;

use rust_ocpp::v1_6::messages::get_configuration::{
    GetConfigurationRequest, GetConfigurationResponse,
};
use serde::Serialize;
use tracing::info;

use crate::application::session::TransportType;
use crate::interfaces::transport::TransportManager;

use super::CommandError;

/// One configuration entry reported by a charge point.
#[derive(Debug, Clone, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub readonly: bool,
    pub value: Option<String>,
}

/// Configuration reported by a charge point.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationResult {
    pub configuration_key: Vec<KeyValue>,
    pub unknown_key: Vec<String>,
}

/// If `keys` is None or empty, the charger returns its full
/// configuration.
pub async fn get_configuration(
    manager: &TransportManager,
    charge_point_id: &str,
    keys: Option<Vec<String>>,
    timeout: Option<Duration>,
) -> Result<(ConfigurationResult, TransportType), CommandError> {
    info!(charge_point_id, ?keys, "GetConfiguration");

    let request = GetConfigurationRequest { key: keys };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let (result, transport) = manager
        .send_message(charge_point_id, "GetConfiguration", payload, None, timeout)
        .await?;

    let response: GetConfigurationResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let configuration_key = response
        .configuration_key
        .unwrap_or_default()
        .into_iter()
        .map(|kv| KeyValue {
            key: kv.key,
            readonly: kv.readonly,
            value: kv.value,
        })
        .collect();

    Ok((
        ConfigurationResult {
            configuration_key,
            unknown_key: response.unknown_key.unwrap_or_default(),
        },
        transport,
    ))
}
