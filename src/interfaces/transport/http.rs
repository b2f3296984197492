//! HTTP transport adapter (long-poll / request-queue)
//!
//! HTTP is client-initiated, so CSMS→charger calls cannot be pushed:
//! they are queued per charger and drained FIFO, piggybacked on the
//! charger's next `POST /ocpp/{chargerId}` or fetched via
//! `GET /ocpp/{chargerId}`. A charger counts as connected for 300
//! seconds after its last request.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{json, Value};
use tracing::info;

use crate::application::session::TransportType;
use crate::support::ocpp_frame::{OcppFrame, WireFormat};

use super::{ReplyEnvelope, TransportAdapter, TransportContext, TransportError};

/// Idle window after which an HTTP charger counts as disconnected.
const LIVENESS_WINDOW_SECS: i64 = 300;

pub struct HttpTransport {
    ctx: TransportContext,
    /// Queued CSMS→charger calls, drained FIFO.
    queues: DashMap<String, VecDeque<OcppFrame>>,
    last_seen: DashMap<String, DateTime<Utc>>,
}

impl HttpTransport {
    pub fn new(ctx: TransportContext) -> Self {
        Self {
            ctx,
            queues: DashMap::new(),
            last_seen: DashMap::new(),
        }
    }

    /// Routes for the charger-facing endpoints, mounted once on the
    /// API router.
    pub fn router(adapter: Arc<HttpTransport>) -> Router {
        Router::new()
            .route("/ocpp/{charge_point_id}", post(post_ocpp).get(get_ocpp))
            .with_state(adapter)
    }

    fn touch(&self, charge_point_id: &str) {
        let newly_seen = self
            .last_seen
            .insert(charge_point_id.to_string(), Utc::now())
            .is_none();
        if newly_seen {
            self.ctx
                .connections
                .register(charge_point_id, TransportType::Http);
        } else {
            self.ctx
                .connections
                .touch(charge_point_id, TransportType::Http);
        }
    }

    /// Pop the next queued CSMS call for the charger, as a standard
    /// 4-array value.
    fn dequeue(&self, charge_point_id: &str) -> Option<Value> {
        self.queues
            .get_mut(charge_point_id)
            .and_then(|mut queue| queue.pop_front())
            .map(|frame| frame.to_value())
    }

    /// Handle a charger POST: dispatch the message, piggyback the next
    /// queued CSMS call.
    pub async fn handle_post(&self, charge_point_id: &str, body: &str) -> Value {
        self.touch(charge_point_id);

        let reply = self
            .ctx
            .handle_incoming(charge_point_id, TransportType::Http, body)
            .await;

        let mut response = json!({ "response": reply.map(http_response_value) });
        if let Some(pending) = self.dequeue(charge_point_id) {
            response["pending"] = pending;
        }
        response
    }

    /// Handle a poll-only GET.
    pub fn handle_poll(&self, charge_point_id: &str) -> Value {
        self.touch(charge_point_id);
        json!({ "pending": self.dequeue(charge_point_id) })
    }

    /// Remove a queued call that was never picked up (timed out or
    /// cancelled).
    fn remove_queued(&self, charge_point_id: &str, unique_id: &str) {
        if let Some(mut queue) = self.queues.get_mut(charge_point_id) {
            queue.retain(|frame| frame.unique_id() != unique_id);
        }
    }
}

/// The `"response"` field shape: the standard 4-array for OCPP-format
/// requests, the bare payload for legacy dictionary requests.
fn http_response_value(reply: ReplyEnvelope) -> Value {
    match reply.format {
        WireFormat::Standard => reply.frame.to_value(),
        WireFormat::Simplified => match reply.frame {
            OcppFrame::CallResult { payload, .. } => payload,
            OcppFrame::CallError {
                error_code,
                error_description,
                ..
            } => json!({
                "errorCode": error_code,
                "errorDescription": error_description,
            }),
            OcppFrame::Call { payload, .. } => payload,
        },
    }
}

#[async_trait]
impl TransportAdapter for HttpTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Http
    }

    async fn start(&self) -> Result<(), TransportError> {
        // Served by the API router; nothing to spin up.
        info!("HTTP transport ready (long-poll, {}s liveness window)", LIVENESS_WINDOW_SECS);
        Ok(())
    }

    async fn stop(&self) {
        for entry in self.last_seen.iter() {
            self.ctx.pending.cancel_for_charger(entry.key());
            self.ctx.connections.unregister(entry.key(), TransportType::Http);
        }
        self.queues.clear();
        self.last_seen.clear();
    }

    async fn send_message(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        if !self.is_connected(charge_point_id) {
            return Err(TransportError::NotConnected(charge_point_id.to_string()));
        }

        let (unique_id, rx) = self.ctx.pending.register(charge_point_id, action);
        let frame = OcppFrame::Call {
            unique_id: unique_id.clone(),
            action: action.to_string(),
            payload,
        };

        self.queues
            .entry(charge_point_id.to_string())
            .or_default()
            .push_back(frame);
        info!(charge_point_id, action, unique_id = unique_id.as_str(), "HTTP call queued");

        let result = self
            .ctx
            .pending
            .await_response(&unique_id, rx, timeout)
            .await;

        if result.is_err() {
            // Never picked up (or the reply never came); drop it from
            // the queue so the charger does not execute a call whose
            // caller already gave up.
            self.remove_queued(charge_point_id, &unique_id);
        }
        result
    }

    fn is_connected(&self, charge_point_id: &str) -> bool {
        self.last_seen
            .get(charge_point_id)
            .map(|seen| (Utc::now() - *seen).num_seconds() < LIVENESS_WINDOW_SECS)
            .unwrap_or(false)
    }
}

// ── axum handlers ──────────────────────────────────────────────

async fn post_ocpp(
    State(adapter): State<Arc<HttpTransport>>,
    Path(charge_point_id): Path<String>,
    body: String,
) -> Json<Value> {
    Json(adapter.handle_post(&charge_point_id, &body).await)
}

async fn get_ocpp(
    State(adapter): State<Arc<HttpTransport>>,
    Path(charge_point_id): Path<String>,
) -> Json<Value> {
    Json(adapter.handle_poll(&charge_point_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::OcppDispatcher;
    use crate::application::services::{BillingService, ChargePointService};
    use crate::application::session::ConnectionRegistry;
    use crate::domain::RepositoryProvider;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use crate::interfaces::transport::PendingResponseRegistry;

    fn adapter() -> Arc<HttpTransport> {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let service = Arc::new(ChargePointService::new(repos.clone()));
        let billing = Arc::new(BillingService::new(repos));
        let ctx = TransportContext::new(
            OcppDispatcher::shared(service, billing, 60),
            PendingResponseRegistry::shared(),
            ConnectionRegistry::shared(),
        );
        Arc::new(HttpTransport::new(ctx))
    }

    #[tokio::test]
    async fn post_dispatches_and_replies_in_ocpp_format() {
        let adapter = adapter();

        let response = adapter
            .handle_post("CP1", r#"[2,"h1","Heartbeat",{}]"#)
            .await;

        let frame = response["response"].as_array().unwrap();
        assert_eq!(frame[0], 3);
        assert_eq!(frame[1], "h1");
        assert!(frame[2]["currentTime"].as_str().unwrap().ends_with('Z'));
        assert!(response.get("pending").is_none());
    }

    #[tokio::test]
    async fn post_accepts_simplified_dict_and_replies_in_kind() {
        let adapter = adapter();

        let response = adapter
            .handle_post("CP1", r#"{"action":"Heartbeat","payload":{}}"#)
            .await;

        // Bare payload, no frame wrapper.
        assert!(response["response"]["currentTime"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn queued_calls_drain_fifo_and_resolve_on_reply() {
        let adapter = adapter();

        // Charger announces itself so the adapter counts it connected.
        adapter.handle_post("CP1", r#"[2,"h1","Heartbeat",{}]"#).await;
        assert!(adapter.is_connected("CP1"));

        let first = {
            let adapter = adapter.clone();
            tokio::spawn(async move {
                adapter
                    .send_message("CP1", "GetConfiguration", json!({}), Duration::from_secs(5))
                    .await
            })
        };
        // Queue order is deterministic only once the first call is
        // enqueued.
        tokio::task::yield_now().await;
        let second = {
            let adapter = adapter.clone();
            tokio::spawn(async move {
                adapter
                    .send_message("CP1", "Reset", json!({"type": "Soft"}), Duration::from_secs(5))
                    .await
            })
        };
        tokio::task::yield_now().await;

        // The next poll drains the first queued call.
        let poll = adapter.handle_poll("CP1");
        let pending = poll["pending"].as_array().unwrap();
        assert_eq!(pending[0], 2);
        assert_eq!(pending[2], "GetConfiguration");
        let first_uid = pending[1].as_str().unwrap().to_string();

        // Charger answers over its next POST; the waiting caller
        // resolves.
        let reply = format!(r#"[3,"{}",{{"configurationKey":[]}}]"#, first_uid);
        let response = adapter.handle_post("CP1", &reply).await;
        let result = first.await.unwrap().unwrap();
        assert_eq!(result["configurationKey"], json!([]));

        // The second queued call rode along on that POST.
        let pending = response["pending"].as_array().unwrap();
        assert_eq!(pending[2], "Reset");
        let second_uid = pending[1].as_str().unwrap().to_string();
        adapter
            .handle_post("CP1", &format!(r#"[3,"{}",{{"status":"Accepted"}}]"#, second_uid))
            .await;
        let result = second.await.unwrap().unwrap();
        assert_eq!(result["status"], "Accepted");
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_call_is_removed_from_queue() {
        let adapter = adapter();
        adapter.handle_post("CP1", r#"[2,"h1","Heartbeat",{}]"#).await;

        let err = adapter
            .send_message("CP1", "Reset", json!({"type": "Soft"}), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::RequestTimeout));

        // The stale call must not reach the charger on its next poll.
        let poll = adapter.handle_poll("CP1");
        assert!(poll["pending"].is_null());
    }

    #[tokio::test]
    async fn offline_charger_is_not_connected() {
        let adapter = adapter();
        assert!(!adapter.is_connected("CP-never-seen"));

        let err = adapter
            .send_message("CP-never-seen", "Reset", json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected(_)));
    }

    #[tokio::test]
    async fn liveness_window_expires() {
        let adapter = adapter();
        adapter.handle_post("CP1", r#"[2,"h1","Heartbeat",{}]"#).await;
        assert!(adapter.is_connected("CP1"));

        adapter.last_seen.insert(
            "CP1".to_string(),
            Utc::now() - chrono::Duration::seconds(LIVENESS_WINDOW_SECS + 1),
        );
        assert!(!adapter.is_connected("CP1"));
    }
}
