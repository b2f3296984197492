//! Pending-response registry
//!
//! Correlates outbound CALLs with inbound CALLRESULT/CALLERROR frames
//! by UniqueId, across every transport. Entries are consumed on first
//! match; a reply arriving after timeout or cancellation is dropped
//! without effect. Closing a transport cancels every entry for that
//! charger with `ConnectionClosed`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::support::ocpp_frame::generate_unique_id;

use super::TransportError;

struct PendingEntry {
    charge_point_id: String,
    action: String,
    sender: oneshot::Sender<Result<Value, TransportError>>,
}

/// Receiver half handed to the waiting caller.
pub type PendingReceiver = oneshot::Receiver<Result<Value, TransportError>>;

/// Registry of in-flight outbound CALLs keyed by UniqueId.
pub struct PendingResponseRegistry {
    entries: DashMap<String, PendingEntry>,
}

pub type SharedPendingRegistry = Arc<PendingResponseRegistry>;

impl PendingResponseRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn shared() -> SharedPendingRegistry {
        Arc::new(Self::new())
    }

    /// Register a new in-flight call. Returns the generated UniqueId
    /// and the receiver the caller awaits on.
    pub fn register(&self, charge_point_id: &str, action: &str) -> (String, PendingReceiver) {
        let unique_id = generate_unique_id();
        let (tx, rx) = oneshot::channel();
        self.entries.insert(
            unique_id.clone(),
            PendingEntry {
                charge_point_id: charge_point_id.to_string(),
                action: action.to_string(),
                sender: tx,
            },
        );
        (unique_id, rx)
    }

    /// Resolve an entry with a CALLRESULT payload.
    /// Returns `false` when no entry matched (late or unknown reply).
    pub fn complete(&self, unique_id: &str, payload: Value) -> bool {
        match self.entries.remove(unique_id) {
            Some((_, entry)) => {
                info!(
                    charge_point_id = entry.charge_point_id.as_str(),
                    action = entry.action.as_str(),
                    unique_id,
                    "Received response"
                );
                let _ = entry.sender.send(Ok(payload));
                true
            }
            None => {
                warn!(unique_id, "Reply for unknown or expired request, dropping");
                false
            }
        }
    }

    /// Resolve an entry with a CALLERROR.
    pub fn fail(&self, unique_id: &str, code: &str, description: &str) -> bool {
        match self.entries.remove(unique_id) {
            Some((_, entry)) => {
                warn!(
                    charge_point_id = entry.charge_point_id.as_str(),
                    action = entry.action.as_str(),
                    unique_id,
                    code,
                    description,
                    "Received error"
                );
                let _ = entry.sender.send(Err(TransportError::CallError {
                    code: code.to_string(),
                    description: description.to_string(),
                }));
                true
            }
            None => false,
        }
    }

    /// Resolve the oldest in-flight call for `(charger, action)`.
    ///
    /// Legacy dictionary replies carry no UniqueId; action-based
    /// correlation is the best available.
    pub fn complete_for_action(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
    ) -> bool {
        let unique_id = self
            .entries
            .iter()
            .find(|e| {
                e.value().charge_point_id == charge_point_id && e.value().action == action
            })
            .map(|e| e.key().clone());

        match unique_id {
            Some(id) => self.complete(&id, payload),
            None => {
                warn!(charge_point_id, action, "Legacy reply with no matching request, dropping");
                false
            }
        }
    }

    /// Remove an entry without resolving it (caller-side cancellation
    /// or timeout). A subsequent reply is silently discarded.
    pub fn cancel(&self, unique_id: &str) {
        self.entries.remove(unique_id);
    }

    /// Fail every in-flight call for a charger with `ConnectionClosed`.
    pub fn cancel_for_charger(&self, charge_point_id: &str) {
        let ids: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().charge_point_id == charge_point_id)
            .map(|e| e.key().clone())
            .collect();

        for unique_id in ids {
            if let Some((_, entry)) = self.entries.remove(&unique_id) {
                warn!(
                    charge_point_id,
                    action = entry.action.as_str(),
                    unique_id = unique_id.as_str(),
                    "Cancelling in-flight call, connection closed"
                );
                let _ = entry.sender.send(Err(TransportError::ConnectionClosed));
            }
        }
    }

    /// Number of in-flight calls.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Await the response for a registered call, enforcing the
    /// timeout. On expiry the entry is removed so a late reply has no
    /// effect, and the caller sees `RequestTimeout`.
    pub async fn await_response(
        &self,
        unique_id: &str,
        rx: PendingReceiver,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                // Sender dropped without resolving; treat as a closed
                // transport.
                self.cancel(unique_id);
                Err(TransportError::ConnectionClosed)
            }
            Err(_) => {
                self.cancel(unique_id);
                Err(TransportError::RequestTimeout)
            }
        }
    }
}

impl Default for PendingResponseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn complete_resolves_waiting_caller() {
        let registry = PendingResponseRegistry::new();
        let (id, rx) = registry.register("CP1", "GetConfiguration");

        assert!(registry.complete(&id, json!({"configurationKey": []})));
        let result = registry
            .await_response(&id, rx, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result["configurationKey"], json!([]));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn call_error_propagates_code() {
        let registry = PendingResponseRegistry::new();
        let (id, rx) = registry.register("CP1", "Reset");

        registry.fail(&id, "NotSupported", "no");
        let err = registry
            .await_response(&id, rx, Duration::from_secs(1))
            .await
            .unwrap_err();
        match err {
            TransportError::CallError { code, .. } => assert_eq!(code, "NotSupported"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_resolves_exactly_once_and_drops_late_reply() {
        let registry = PendingResponseRegistry::new();
        let (id, rx) = registry.register("CP1", "GetConfiguration");

        let err = registry
            .await_response(&id, rx, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::RequestTimeout));
        assert!(registry.is_empty());

        // Late reply after expiry: no entry, silently dropped.
        assert!(!registry.complete(&id, json!({})));
    }

    #[tokio::test]
    async fn disconnect_cancels_all_for_charger() {
        let registry = PendingResponseRegistry::new();
        let (id1, rx1) = registry.register("CP1", "Reset");
        let (_id2, rx2) = registry.register("CP1", "UnlockConnector");
        let (id3, rx3) = registry.register("CP2", "Reset");

        registry.cancel_for_charger("CP1");

        let err = registry
            .await_response(&id1, rx1, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
        let err = registry
            .await_response("unused", rx2, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));

        // Other chargers are untouched.
        assert_eq!(registry.len(), 1);
        registry.complete(&id3, json!({}));
        assert!(registry
            .await_response(&id3, rx3, Duration::from_secs(1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn cancelled_entry_ignores_reply() {
        let registry = PendingResponseRegistry::new();
        let (id, _rx) = registry.register("CP1", "Reset");
        registry.cancel(&id);
        assert!(!registry.complete(&id, json!({})));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn legacy_reply_correlates_by_action() {
        let registry = PendingResponseRegistry::new();
        let (_, rx) = registry.register("CP1", "GetConfiguration");

        assert!(!registry.complete_for_action("CP1", "Reset", json!({})));
        assert!(registry.complete_for_action("CP1", "GetConfiguration", json!({"unknownKey": []})));

        let result = registry
            .await_response("unused", rx, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result["unknownKey"], json!([]));
    }

    #[test]
    fn unique_ids_are_unique_within_window() {
        let registry = PendingResponseRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..256 {
            let (id, _rx) = registry.register("CP1", "Heartbeat");
            assert!(seen.insert(id));
        }
    }
}
