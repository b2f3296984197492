//! RemoteStartTransaction command

use std::time::Duration;

use rust_ocpp::v1_6::messages::remote_start_transaction::{
    RemoteStartTransactionRequest, RemoteStartTransactionResponse,
};
use tracing::info;

use crate::application::session::TransportType;
use crate::interfaces::transport::TransportManager;

use super::CommandError;

pub async fn remote_start_transaction(
    manager: &TransportManager,
    charge_point_id: &str,
    id_tag: &str,
    connector_id: Option<u32>,
    timeout: Option<Duration>,
) -> Result<(String, TransportType), CommandError> {
    info!(charge_point_id, id_tag, ?connector_id, "RemoteStartTransaction");

    let request = RemoteStartTransactionRequest {
        connector_id,
        id_tag: id_tag.to_string(),
        charging_profile: None,
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let (result, transport) = manager
        .send_message(charge_point_id, "RemoteStartTransaction", payload, None, timeout)
        .await?;

    let response: RemoteStartTransactionResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok((format!("{:?}", response.status), transport))
}
