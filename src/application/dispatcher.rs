//! OCPP dispatcher
//!
//! Applies inbound CP→CS calls to the state model and produces the
//! reply frame. Guarantees:
//!
//! - per-charger serialization: one charger's calls are handled in
//!   receive order (keyed mutex); distinct chargers run in parallel
//! - every failure becomes a CALLERROR; nothing propagates far enough
//!   to crash a transport loop

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::application::handlers::{action_matcher, OcppHandler};
use crate::application::services::{BillingService, ChargePointService};
use crate::support::ocpp_frame::OcppFrame;

pub struct OcppDispatcher {
    service: Arc<ChargePointService>,
    billing: Arc<BillingService>,
    heartbeat_interval: u32,
    charger_locks: DashMap<String, Arc<Mutex<()>>>,
}

pub type SharedOcppDispatcher = Arc<OcppDispatcher>;

impl OcppDispatcher {
    pub fn new(
        service: Arc<ChargePointService>,
        billing: Arc<BillingService>,
        heartbeat_interval: u32,
    ) -> Self {
        Self {
            service,
            billing,
            heartbeat_interval,
            charger_locks: DashMap::new(),
        }
    }

    pub fn shared(
        service: Arc<ChargePointService>,
        billing: Arc<BillingService>,
        heartbeat_interval: u32,
    ) -> SharedOcppDispatcher {
        Arc::new(Self::new(service, billing, heartbeat_interval))
    }

    /// Handle one inbound CALL and produce the reply frame
    /// (CALLRESULT or CALLERROR) echoing the UniqueId.
    pub async fn dispatch_call(
        &self,
        charge_point_id: &str,
        unique_id: &str,
        action: &str,
        payload: &Value,
    ) -> OcppFrame {
        // Serialize handling per charger so state transitions stay
        // monotonic within one inbound stream.
        let lock = self
            .charger_locks
            .entry(charge_point_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _serialized = lock.lock().await;

        metrics::counter!("ocpp_messages_total", "direction" => "inbound", "action" => action.to_string())
            .increment(1);

        let handler = OcppHandler {
            charge_point_id: charge_point_id.to_string(),
            service: self.service.clone(),
            billing: self.billing.clone(),
            heartbeat_interval: self.heartbeat_interval,
        };

        match action_matcher(&handler, action, payload).await {
            Ok(reply) => OcppFrame::result(unique_id, reply),
            Err(e) => {
                warn!(
                    charge_point_id,
                    action,
                    unique_id,
                    code = e.code.as_str(),
                    description = e.description.as_str(),
                    "Call failed"
                );
                OcppFrame::error(unique_id, e.code, e.description)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EvseState, RepositoryProvider, SessionStatus, Tariff};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn world() -> (Arc<InMemoryRepositoryProvider>, OcppDispatcher) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let provider: Arc<dyn RepositoryProvider> = repos.clone();
        let service = Arc::new(ChargePointService::new(provider.clone()));
        let billing = Arc::new(BillingService::new(provider));
        let dispatcher = OcppDispatcher::new(service, billing, 60);
        (repos, dispatcher)
    }

    fn result_payload(frame: &OcppFrame) -> &Value {
        match frame {
            OcppFrame::CallResult { payload, .. } => payload,
            other => panic!("expected CallResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn boot_notification_registers_charge_point() {
        let (repos, dispatcher) = world();

        let reply = dispatcher
            .dispatch_call(
                "861076087029615",
                "abc1",
                "BootNotification",
                &json!({
                    "chargePointVendor": "ZCF",
                    "chargePointModel": "F1Pro",
                    "chargePointSerialNumber": "861076087029615",
                    "firmwareVersion": "V100.01",
                }),
            )
            .await;

        assert_eq!(reply.unique_id(), "abc1");
        let payload = result_payload(&reply);
        assert_eq!(payload["status"], "Accepted");
        assert_eq!(payload["interval"], 60);
        let current_time = payload["currentTime"].as_str().unwrap();
        assert!(current_time.ends_with('Z'), "expected Z suffix: {current_time}");

        let cp = repos
            .charge_points()
            .find_by_id("861076087029615")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cp.serial_number.as_deref(), Some("861076087029615"));
        assert!(cp.last_seen.is_some());

        let status = repos
            .evses()
            .get_status("861076087029615", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.status, EvseState::Available);
    }

    #[tokio::test]
    async fn authorize_then_start_is_idempotent() {
        let (repos, dispatcher) = world();

        let reply = dispatcher
            .dispatch_call("CP1", "x1", "Authorize", &json!({"idTag": "TAG_1"}))
            .await;
        assert_eq!(result_payload(&reply)["idTagInfo"]["status"], "Accepted");

        let start = json!({
            "connectorId": 1,
            "idTag": "TAG_1",
            "meterStart": 0,
            "timestamp": "2024-06-01T12:00:00Z",
        });
        let reply = dispatcher
            .dispatch_call("CP1", "x2", "StartTransaction", &start)
            .await;
        let tx_id = result_payload(&reply)["transactionId"].as_i64().unwrap();
        assert!(tx_id >= 1);

        let status = repos.evses().get_status("CP1", 1).await.unwrap().unwrap();
        assert_eq!(status.status, EvseState::Charging);

        // A retried StartTransaction returns the same transaction and
        // creates no second session.
        let reply = dispatcher
            .dispatch_call("CP1", "x2b", "StartTransaction", &start)
            .await;
        assert_eq!(
            result_payload(&reply)["transactionId"].as_i64().unwrap(),
            tx_id
        );
        let sessions = repos.sessions().find_for_charge_point("CP1").await.unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn meter_values_then_stop_completes_session() {
        let (repos, dispatcher) = world();

        repos
            .tariffs()
            .save(Tariff {
                id: 0,
                site_id: None,
                name: "default".into(),
                base_price_per_kwh: 0.30,
                currency: "USD".into(),
                valid_from: Utc::now() - Duration::days(1),
                valid_until: None,
                is_active: true,
            })
            .await
            .unwrap();

        let reply = dispatcher
            .dispatch_call(
                "CP1",
                "x2",
                "StartTransaction",
                &json!({
                    "connectorId": 1,
                    "idTag": "TAG_1",
                    "meterStart": 0,
                    "timestamp": "2024-06-01T12:00:00Z",
                }),
            )
            .await;
        let tx_id = result_payload(&reply)["transactionId"].as_i64().unwrap() as i32;

        let reply = dispatcher
            .dispatch_call(
                "CP1",
                "x3",
                "MeterValues",
                &json!({
                    "connectorId": 1,
                    "transactionId": tx_id,
                    "meterValue": [{
                        "timestamp": "2024-06-01T12:30:00Z",
                        "sampledValue": [{
                            "value": "3500",
                            "measurand": "Energy.Active.Import.Register",
                            "unit": "Wh",
                        }],
                    }],
                }),
            )
            .await;
        assert_eq!(result_payload(&reply), &json!({}));

        let samples = repos
            .sessions()
            .meter_values_for_transaction(tx_id)
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, "3500");
        assert_eq!(samples[0].measurand, "Energy.Active.Import.Register");

        let reply = dispatcher
            .dispatch_call(
                "CP1",
                "x4",
                "StopTransaction",
                &json!({
                    "transactionId": tx_id,
                    "meterStop": 7000,
                    "timestamp": "2024-06-01T12:30:00Z",
                }),
            )
            .await;
        assert_eq!(
            result_payload(&reply)["idTagInfo"]["status"],
            "Accepted"
        );

        let session = repos
            .sessions()
            .find_by_transaction_id(tx_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.energy_wh(), Some(7000));
        assert!(session.end_time.unwrap() >= session.start_time);

        let status = repos.evses().get_status("CP1", 1).await.unwrap().unwrap();
        assert_eq!(status.status, EvseState::Available);

        let order = repos
            .orders()
            .find_by_transaction_id(tx_id)
            .await
            .unwrap()
            .unwrap();
        assert!((order.energy_kwh - 7.0).abs() < 1e-9);
        assert!((order.amount - 2.1).abs() < 1e-9);

        // Retried stop: same reply, no mutation, still one order.
        let reply = dispatcher
            .dispatch_call(
                "CP1",
                "x5",
                "StopTransaction",
                &json!({
                    "transactionId": tx_id,
                    "meterStop": 9999,
                    "timestamp": "2024-06-01T13:00:00Z",
                }),
            )
            .await;
        assert_eq!(result_payload(&reply)["idTagInfo"]["status"], "Accepted");
        let session = repos
            .sessions()
            .find_by_transaction_id(tx_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.meter_stop, Some(7000));
    }

    #[tokio::test]
    async fn station_status_uses_synthetic_row() {
        let (repos, dispatcher) = world();

        dispatcher
            .dispatch_call(
                "CP1",
                "s1",
                "StatusNotification",
                &json!({
                    "connectorId": 0,
                    "errorCode": "NoError",
                    "status": "Available",
                }),
            )
            .await;

        let status = repos.evses().get_status("CP1", 0).await.unwrap().unwrap();
        assert_eq!(status.status, EvseState::Available);
        // connectorId 0 never creates an EVSE row
        assert!(repos.evses().find_for_charge_point("CP1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn faulted_status_records_error_code() {
        let (repos, dispatcher) = world();

        dispatcher
            .dispatch_call(
                "CP1",
                "s2",
                "StatusNotification",
                &json!({
                    "connectorId": 1,
                    "errorCode": "GroundFailure",
                    "status": "Faulted",
                }),
            )
            .await;

        let status = repos.evses().get_status("CP1", 1).await.unwrap().unwrap();
        assert_eq!(status.status, EvseState::Faulted);
        assert_eq!(status.error_code.as_deref(), Some("GroundFailure"));
    }

    #[tokio::test]
    async fn unknown_action_is_not_supported() {
        let (_repos, dispatcher) = world();

        let reply = dispatcher
            .dispatch_call("CP1", "u1", "FlushCapacitor", &json!({}))
            .await;
        match reply {
            OcppFrame::CallError {
                unique_id,
                error_code,
                ..
            } => {
                assert_eq!(unique_id, "u1");
                assert_eq!(error_code, "NotSupported");
            }
            other => panic!("expected CallError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_required_field_is_occurrence_violation() {
        let (_repos, dispatcher) = world();

        let reply = dispatcher
            .dispatch_call(
                "CP1",
                "v1",
                "StartTransaction",
                &json!({"connectorId": 1, "meterStart": 0}),
            )
            .await;
        match reply {
            OcppFrame::CallError { error_code, .. } => {
                assert_eq!(error_code, "OccurrenceConstraintViolation");
            }
            other => panic!("expected CallError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_type_is_type_constraint_violation() {
        let (_repos, dispatcher) = world();

        let reply = dispatcher
            .dispatch_call(
                "CP1",
                "v2",
                "StartTransaction",
                &json!({
                    "connectorId": "one",
                    "idTag": "TAG_1",
                    "meterStart": 0,
                    "timestamp": "2024-06-01T12:00:00Z",
                }),
            )
            .await;
        match reply {
            OcppFrame::CallError { error_code, .. } => {
                assert_eq!(error_code, "TypeConstraintViolation");
            }
            other => panic!("expected CallError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn authorize_consults_token_store_when_present() {
        let (repos, dispatcher) = world();

        repos
            .id_tags()
            .save(crate::domain::IdTag {
                id_tag: "KNOWN".into(),
                is_active: true,
                expiry_date: None,
                parent_id_tag: None,
            })
            .await
            .unwrap();

        let reply = dispatcher
            .dispatch_call("CP1", "a1", "Authorize", &json!({"idTag": "KNOWN"}))
            .await;
        assert_eq!(result_payload(&reply)["idTagInfo"]["status"], "Accepted");

        let reply = dispatcher
            .dispatch_call("CP1", "a2", "Authorize", &json!({"idTag": "STRANGER"}))
            .await;
        assert_eq!(result_payload(&reply)["idTagInfo"]["status"], "Invalid");
    }
}
