//! Reset command

use std::time::Duration;

use rust_ocpp::v1_6::messages::reset::{ResetRequest, ResetResponse};
use rust_ocpp::v1_6::types::ResetRequestStatus;
use tracing::info;

use crate::application::session::TransportType;
use crate::interfaces::transport::TransportManager;

use super::CommandError;

/// Reset type for the charge point.
#[derive(Debug, Clone, Copy)]
pub enum ResetKind {
    /// Restart without power cycle.
    Soft,
    /// Full power cycle.
    Hard,
}

impl ResetKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Soft" => Some(Self::Soft),
            "Hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

pub async fn reset(
    manager: &TransportManager,
    charge_point_id: &str,
    reset_type: ResetKind,
    timeout: Option<Duration>,
) -> Result<(String, TransportType), CommandError> {
    info!(charge_point_id, ?reset_type, "Reset");

    let kind = match reset_type {
        ResetKind::Soft => ResetRequestStatus::Soft,
        ResetKind::Hard => ResetRequestStatus::Hard,
    };

    let request = ResetRequest { kind };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let (result, transport) = manager
        .send_message(charge_point_id, "Reset", payload, None, timeout)
        .await?;

    let response: ResetResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok((format!("{:?}", response.status), transport))
}
