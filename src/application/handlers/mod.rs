//! OCPP 1.6 action handlers
//!
//! Routes CP→CS action names to their handlers. Payloads are
//! deserialized into `rust_ocpp::v1_6` request types inside each
//! handler; deserialization failures are classified into the matching
//! OCPP error code and surface as CALLERROR frames.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::application::services::{BillingService, ChargePointService};
use crate::domain::DomainError;
use crate::support::ocpp_frame::OcppErrorCode;

mod handle_authorize;
mod handle_boot_notification;
mod handle_heartbeat;
mod handle_meter_values;
mod handle_start_transaction;
mod handle_status_notification;
mod handle_stop_transaction;

pub use handle_authorize::handle_authorize;
pub use handle_boot_notification::handle_boot_notification;
pub use handle_heartbeat::handle_heartbeat;
pub use handle_meter_values::handle_meter_values;
pub use handle_start_transaction::handle_start_transaction;
pub use handle_status_notification::handle_status_notification;
pub use handle_stop_transaction::handle_stop_transaction;

// ── Handler context ────────────────────────────────────────────

/// Per-message handler context.
pub struct OcppHandler {
    pub charge_point_id: String,
    pub service: Arc<ChargePointService>,
    pub billing: Arc<BillingService>,
    /// Heartbeat cadence handed to chargers in BootNotification
    /// replies, in seconds.
    pub heartbeat_interval: u32,
}

// ── Handler errors ─────────────────────────────────────────────

/// A handler failure that becomes a CALLERROR frame.
#[derive(Debug)]
pub struct OcppCallError {
    pub code: OcppErrorCode,
    pub description: String,
}

impl OcppCallError {
    pub fn new(code: OcppErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

impl From<DomainError> for OcppCallError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::Validation(_) | DomainError::NotFound { .. } => {
                Self::new(OcppErrorCode::PropertyConstraintViolation, err.to_string())
            }
            _ => Self::new(OcppErrorCode::InternalError, err.to_string()),
        }
    }
}

/// Deserialize a payload, classifying serde failures into OCPP error
/// codes: missing field → OccurrenceConstraintViolation, wrong type →
/// TypeConstraintViolation, bad enum value →
/// PropertyConstraintViolation, anything else → FormationViolation.
pub(crate) fn parse_payload<T: DeserializeOwned>(payload: &Value) -> Result<T, OcppCallError> {
    serde_json::from_value(payload.clone()).map_err(|e| {
        let message = e.to_string();
        let code = if message.starts_with("missing field") {
            OcppErrorCode::OccurrenceConstraintViolation
        } else if message.starts_with("invalid type") {
            OcppErrorCode::TypeConstraintViolation
        } else if message.starts_with("unknown variant") {
            OcppErrorCode::PropertyConstraintViolation
        } else {
            OcppErrorCode::FormationViolation
        };
        OcppCallError::new(code, message)
    })
}

/// Wire string of a rust-ocpp enum value (e.g.
/// `Energy.Active.Import.Register`).
pub(crate) fn wire_string<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
}

/// Flatten OCPP meterValue groups into storable samples. The
/// transaction id is filled in by the state engine.
pub(crate) fn samples_from_meter_values(
    values: &[rust_ocpp::v1_6::types::MeterValue],
) -> Vec<crate::domain::MeterValueSample> {
    let mut samples = Vec::new();
    for group in values {
        for sampled in &group.sampled_value {
            samples.push(crate::domain::MeterValueSample {
                id: 0,
                transaction_id: 0,
                timestamp: group.timestamp,
                measurand: sampled
                    .measurand
                    .as_ref()
                    .and_then(wire_string)
                    .unwrap_or_else(|| "Energy.Active.Import.Register".to_string()),
                value: sampled.value.clone(),
                unit: sampled.unit.as_ref().and_then(wire_string),
            });
        }
    }
    samples
}

// ── Action routing ─────────────────────────────────────────────

/// Route an OCPP 1.6 CP→CS action to its handler.
pub async fn action_matcher(
    handler: &OcppHandler,
    action: &str,
    payload: &Value,
) -> Result<Value, OcppCallError> {
    match action {
        "Authorize" => handle_authorize(handler, payload).await,
        "BootNotification" => handle_boot_notification(handler, payload).await,
        "Heartbeat" => handle_heartbeat(handler, payload).await,
        "MeterValues" => handle_meter_values(handler, payload).await,
        "StartTransaction" => handle_start_transaction(handler, payload).await,
        "StatusNotification" => handle_status_notification(handler, payload).await,
        "StopTransaction" => handle_stop_transaction(handler, payload).await,

        unknown => {
            if is_cs_to_cp_action(unknown) {
                warn!(
                    charge_point_id = handler.charge_point_id.as_str(),
                    action = unknown,
                    "Received CS→CP action from charge point (protocol error)"
                );
            }
            Err(OcppCallError::new(
                OcppErrorCode::NotSupported,
                format!("Action not supported: {}", unknown),
            ))
        }
    }
}

/// Check if the action is a CS→CP action (should never arrive from a
/// charge point).
fn is_cs_to_cp_action(action: &str) -> bool {
    matches!(
        action,
        "ChangeAvailability"
            | "ChangeConfiguration"
            | "ClearCache"
            | "GetConfiguration"
            | "RemoteStartTransaction"
            | "RemoteStopTransaction"
            | "Reset"
            | "TriggerMessage"
            | "UnlockConnector"
    )
}
