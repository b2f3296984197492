//! Transport layer — adapters, outbound routing, response correlation.
//!
//! Every transport implements one capability set ([`TransportAdapter`])
//! and shares one [`PendingResponseRegistry`]. Adapters are framing and
//! session binding only; they never touch persistent state.

pub mod http;
pub mod manager;
pub mod mqtt;
pub mod pending;
pub mod websocket;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use tracing::{error, warn};

use crate::application::dispatcher::SharedOcppDispatcher;
use crate::application::session::SharedConnectionRegistry;
use crate::support::ocpp_frame::{OcppErrorCode, OcppFrame, WireFormat};
pub use crate::application::session::TransportType;
pub use manager::{SharedTransportManager, TransportManager};
pub use pending::{PendingResponseRegistry, SharedPendingRegistry};

/// Default timeout for an outbound CALL when the caller supplies none.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

// ── Errors ─────────────────────────────────────────────────────

/// Failures visible to callers sending outbound OCPP calls.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Charge point {0} is not connected")]
    NotConnected(String),

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Failed to send: {0}")]
    SendFailed(String),

    #[error("CallError {code}: {description}")]
    CallError { code: String, description: String },
}

// ── Adapter capability set ─────────────────────────────────────

/// The uniform contract each concrete transport implements.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    fn transport_type(&self) -> TransportType;

    /// Begin accepting/serving charger sessions.
    async fn start(&self) -> Result<(), TransportError>;

    /// Stop the adapter, cancelling in-flight requests.
    async fn stop(&self);

    /// Send an OCPP CALL to a charger and await its CALLRESULT (or
    /// CALLERROR) via the shared pending-response registry.
    async fn send_message(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError>;

    /// Whether the charger currently has a live session here.
    fn is_connected(&self, charge_point_id: &str) -> bool;
}

// ── Shared context ─────────────────────────────────────────────

/// Everything an adapter needs, injected rather than global, so tests
/// can build isolated worlds.
#[derive(Clone)]
pub struct TransportContext {
    pub dispatcher: SharedOcppDispatcher,
    pub pending: SharedPendingRegistry,
    pub connections: SharedConnectionRegistry,
}

impl TransportContext {
    pub fn new(
        dispatcher: SharedOcppDispatcher,
        pending: SharedPendingRegistry,
        connections: SharedConnectionRegistry,
    ) -> Self {
        Self {
            dispatcher,
            pending,
            connections,
        }
    }

    /// The shared inbound path: parse one wire message, route it, and
    /// produce the reply (if the message warrants one).
    ///
    /// - CALL frames run through the dispatcher and yield a reply
    /// - CALLRESULT / CALLERROR frames resolve the pending registry
    /// - wire errors yield a `ProtocolError` CALLERROR when a
    ///   UniqueId is recoverable, otherwise the message is dropped
    pub async fn handle_incoming(
        &self,
        charge_point_id: &str,
        transport: TransportType,
        text: &str,
    ) -> Option<ReplyEnvelope> {
        self.connections.touch(charge_point_id, transport);

        // Legacy dictionary replies ({"action", "response"}) carry no
        // UniqueId; correlate by action before frame parsing.
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text) {
            if obj.contains_key("response") {
                if let Some(action) = obj.get("action").and_then(Value::as_str) {
                    let payload = obj.get("response").cloned().unwrap_or(Value::Null);
                    self.pending
                        .complete_for_action(charge_point_id, action, payload);
                    return None;
                }
            }
        }

        let (frame, format) = match OcppFrame::parse_incoming(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                return match recover_unique_id(text) {
                    Some(unique_id) => {
                        warn!(charge_point_id, %transport, error = %e, "Malformed frame, replying ProtocolError");
                        Some(ReplyEnvelope {
                            frame: OcppFrame::error(
                                unique_id,
                                OcppErrorCode::ProtocolError,
                                e.to_string(),
                            ),
                            format: WireFormat::Standard,
                            action: None,
                        })
                    }
                    None => {
                        error!(charge_point_id, %transport, error = %e, raw = text, "Unparseable message, dropping");
                        None
                    }
                };
            }
        };

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => {
                let reply = self
                    .dispatcher
                    .dispatch_call(charge_point_id, &unique_id, &action, &payload)
                    .await;
                Some(ReplyEnvelope {
                    frame: reply,
                    format,
                    action: Some(action),
                })
            }
            OcppFrame::CallResult { unique_id, payload } => {
                self.pending.complete(&unique_id, payload);
                None
            }
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                self.pending
                    .fail(&unique_id, &error_code, &error_description);
                None
            }
        }
    }
}

/// A reply frame plus the wire shape it must be emitted in.
pub struct ReplyEnvelope {
    pub frame: OcppFrame,
    pub format: WireFormat,
    /// Action of the originating call, used for simplified replies.
    pub action: Option<String>,
}

impl ReplyEnvelope {
    pub fn to_wire_text(&self) -> String {
        match self.format {
            WireFormat::Standard => self.frame.serialize(),
            WireFormat::Simplified => self
                .frame
                .serialize_simplified(self.action.as_deref().unwrap_or("")),
        }
    }
}

/// Best-effort UniqueId recovery from a malformed frame so the error
/// reply can still be correlated.
fn recover_unique_id(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let arr = value.as_array()?;
    arr.first()?.as_u64().filter(|t| (2u64..=4).contains(t))?;
    arr.get(1)?.as_str().map(String::from)
}

pub type SharedTransportAdapter = Arc<dyn TransportAdapter>;
