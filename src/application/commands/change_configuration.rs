//! ChangeConfiguration command

use std::time::Duration;

use rust_ocpp::v1_6::messages::change_configuration::{
    ChangeConfigurationRequest, ChangeConfigurationResponse,
};
use tracing::info;

use crate::application::session::TransportType;
use crate::interfaces::transport::TransportManager;

use super::CommandError;

pub async fn change_configuration(
    manager: &TransportManager,
    charge_point_id: &str,
    key: &str,
    value: &str,
    timeout: Option<Duration>,
) -> Result<(String, TransportType), CommandError> {
    info!(charge_point_id, key, value, "ChangeConfiguration");

    let request = ChangeConfigurationRequest {
        key: key.to_string(),
        value: value.to_string(),
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let (result, transport) = manager
        .send_message(charge_point_id, "ChangeConfiguration", payload, None, timeout)
        .await?;

    let response: ChangeConfigurationResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok((format!("{:?}", response.status), transport))
}
