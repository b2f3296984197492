//! RemoteStopTransaction command

use std::time::Duration;

use rust_ocpp::v1_6::messages::remote_stop_transaction::{
    RemoteStopTransactionRequest, RemoteStopTransactionResponse,
};
use tracing::info;

use crate::application::session::TransportType;
use crate::interfaces::transport::TransportManager;

use super::CommandError;

pub async fn remote_stop_transaction(
    manager: &TransportManager,
    charge_point_id: &str,
    transaction_id: i32,
    timeout: Option<Duration>,
) -> Result<(String, TransportType), CommandError> {
    info!(charge_point_id, transaction_id, "RemoteStopTransaction");

    let request = RemoteStopTransactionRequest { transaction_id };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let (result, transport) = manager
        .send_message(charge_point_id, "RemoteStopTransaction", payload, None, timeout)
        .await?;

    let response: RemoteStopTransactionResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok((format!("{:?}", response.status), transport))
}
