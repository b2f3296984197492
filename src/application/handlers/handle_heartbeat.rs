//! Heartbeat handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::Value;
use tracing::{debug, warn};

use super::{OcppCallError, OcppHandler};

/// Replies immediately with the current time. The `last_seen` touch
/// and audit event are spawned best-effort so heartbeats never queue
/// behind the database under load.
pub async fn handle_heartbeat(
    handler: &OcppHandler,
    _payload: &Value,
) -> Result<Value, OcppCallError> {
    debug!(
        charge_point_id = handler.charge_point_id.as_str(),
        "Heartbeat"
    );

    let service = handler.service.clone();
    let charge_point_id = handler.charge_point_id.clone();
    tokio::spawn(async move {
        if let Err(e) = service.heartbeat(&charge_point_id).await {
            warn!(
                charge_point_id = charge_point_id.as_str(),
                error = %e,
                "Failed to persist heartbeat"
            );
        }
    });

    let response = HeartbeatResponse {
        current_time: Utc::now(),
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
