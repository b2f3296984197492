//! UnlockConnector command

use std::time::Duration;

use rust_ocpp::v1_6::messages::unlock_connector::{
    UnlockConnectorRequest, UnlockConnectorResponse,
};
use tracing::info;

use crate::application::session::TransportType;
use crate::interfaces::transport::TransportManager;

use super::CommandError;

pub async fn unlock_connector(
    manager: &TransportManager,
    charge_point_id: &str,
    connector_id: u32,
    timeout: Option<Duration>,
) -> Result<(String, TransportType), CommandError> {
    info!(charge_point_id, connector_id, "UnlockConnector");

    let request = UnlockConnectorRequest { connector_id };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let (result, transport) = manager
        .send_message(charge_point_id, "UnlockConnector", payload, None, timeout)
        .await?;

    let response: UnlockConnectorResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok((format!("{:?}", response.status), transport))
}
