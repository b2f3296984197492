//! Charge point state engine
//!
//! All OCPP-driven mutations of charge point / EVSE / session state
//! go through here. Handlers stay thin; invariants live in one place:
//!
//! - one EVSEStatus row per EVSE, last-writer-wins by timestamp
//! - at most one Active session per (charge_point_id, evse_id)
//! - StartTransaction / StopTransaction are idempotent against
//!   charger retries

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::domain::{
    ChargePoint, ChargingSession, DeviceEvent, DeviceEventType, DomainError, DomainResult,
    EvseState, EvseStatus, MeterValueSample, RegistrationState, RepositoryProvider, SessionStatus,
    STATION_EVSE_ID,
};

/// Duplicate StartTransaction calls for the same
/// (charge point, connector, idTag) inside this window resolve to the
/// same transaction.
const DUPLICATE_START_WINDOW_SECS: i64 = 10;

/// Result of a StartTransaction mutation.
pub struct StartOutcome {
    pub session: ChargingSession,
    /// False when an existing session was returned (retry).
    pub created: bool,
}

/// Result of a StopTransaction mutation.
#[derive(Debug)]
pub struct StopOutcome {
    pub session: ChargingSession,
    /// True when the session was already Completed and nothing was
    /// mutated.
    pub already_completed: bool,
}

/// Service for charge point business operations
pub struct ChargePointService {
    repos: Arc<dyn RepositoryProvider>,
}

impl ChargePointService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub fn repos(&self) -> &Arc<dyn RepositoryProvider> {
        &self.repos
    }

    // ── BootNotification ───────────────────────────────────

    /// Upsert the charge point (matching on id, then serial number),
    /// mark it accepted, guarantee EVSE 1 exists with an Available
    /// status row, and record the boot event.
    pub async fn register_or_update(
        &self,
        charge_point_id: &str,
        vendor: &str,
        model: &str,
        serial_number: Option<&str>,
        firmware_version: Option<&str>,
    ) -> DomainResult<ChargePoint> {
        let existing = match self.repos.charge_points().find_by_id(charge_point_id).await? {
            Some(cp) => Some(cp),
            None => match serial_number {
                Some(serial) => self.repos.charge_points().find_by_serial(serial).await?,
                None => None,
            },
        };

        let is_new = existing.is_none();
        let mut cp = existing.unwrap_or_else(|| ChargePoint::new(charge_point_id));

        cp.vendor = Some(vendor.to_string());
        cp.model = Some(model.to_string());
        cp.serial_number = serial_number.map(String::from);
        cp.firmware_version = firmware_version.map(String::from);
        cp.registration = RegistrationState::Accepted;
        cp.touch();

        // Link the credentialed device when one is provisioned under
        // the same serial.
        if let Some(serial) = serial_number {
            if self.repos.devices().find_by_serial(serial).await?.is_some() {
                cp.device_serial_number = Some(serial.to_string());
            }
        }

        if is_new {
            self.repos.charge_points().save(cp.clone()).await?;
        } else {
            self.repos.charge_points().update(cp.clone()).await?;
        }

        // The matched row's id wins when the station reconnected under
        // a serial registered to a different id.
        self.ensure_default_evse(&cp.id).await?;

        self.log_event(
            &cp.id,
            cp.device_serial_number.as_deref(),
            DeviceEventType::Boot,
            Some(json!({
                "vendor": vendor,
                "model": model,
                "serialNumber": serial_number,
                "firmwareVersion": firmware_version,
            })),
        )
        .await?;

        info!(charge_point_id, vendor, model, "Charge point registered");
        Ok(cp)
    }

    /// Guarantee EVSE 1 exists and has a status row.
    async fn ensure_default_evse(&self, charge_point_id: &str) -> DomainResult<()> {
        self.repos.evses().ensure(charge_point_id, 1).await?;
        if self.repos.evses().get_status(charge_point_id, 1).await?.is_none() {
            self.repos
                .evses()
                .set_status(EvseStatus::new(charge_point_id, 1, EvseState::Available))
                .await?;
        }
        Ok(())
    }

    // ── Heartbeat ──────────────────────────────────────────

    /// Touch `last_seen` and record the heartbeat. Callers invoke this
    /// best-effort off the reply path.
    pub async fn heartbeat(&self, charge_point_id: &str) -> DomainResult<()> {
        self.repos
            .charge_points()
            .touch_last_seen(charge_point_id, Utc::now())
            .await?;
        self.log_event(charge_point_id, None, DeviceEventType::Heartbeat, None)
            .await
    }

    // ── StatusNotification ─────────────────────────────────

    /// Write the EVSEStatus row for `(charge_point_id, connector_id)`.
    ///
    /// `connector_id = 0` maps to the synthetic whole-station row and
    /// never creates an EVSE. Updates are last-writer-wins by
    /// timestamp.
    pub async fn update_evse_status(
        &self,
        charge_point_id: &str,
        connector_id: i32,
        status: EvseState,
        error_code: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if connector_id != STATION_EVSE_ID {
            self.repos.evses().ensure(charge_point_id, connector_id).await?;
        }

        self.repos
            .evses()
            .set_status(EvseStatus {
                charge_point_id: charge_point_id.to_string(),
                evse_id: connector_id,
                status,
                error_code: error_code.clone(),
                last_seen: at,
            })
            .await?;

        let event_type = if error_code.is_some() {
            DeviceEventType::Error
        } else {
            DeviceEventType::StatusChange
        };
        self.log_event(
            charge_point_id,
            None,
            event_type,
            Some(json!({
                "connectorId": connector_id,
                "status": status.as_str(),
                "errorCode": error_code,
            })),
        )
        .await
    }

    // ── Authorize ──────────────────────────────────────────

    /// Accept-all when the token store is empty; otherwise the tag
    /// must exist, be active, and be unexpired.
    pub async fn authorize(&self, id_tag: &str) -> DomainResult<bool> {
        if self.repos.id_tags().count().await? == 0 {
            return Ok(true);
        }
        Ok(self
            .repos
            .id_tags()
            .find(id_tag)
            .await?
            .map(|tag| tag.is_valid_at(Utc::now()))
            .unwrap_or(false))
    }

    // ── StartTransaction ───────────────────────────────────

    /// Begin a charging session, idempotently.
    ///
    /// An Active session on the EVSE is returned as-is; a duplicate
    /// start for the same idTag inside the retry window resolves to
    /// the session it already created.
    pub async fn start_transaction(
        &self,
        charge_point_id: &str,
        connector_id: i32,
        id_tag: &str,
        meter_start: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<StartOutcome> {
        if let Some(existing) = self
            .repos
            .sessions()
            .find_active_for_evse(charge_point_id, connector_id)
            .await?
        {
            return Ok(StartOutcome {
                session: existing,
                created: false,
            });
        }

        // Retry after the session already stopped: match the original
        // transaction instead of opening a new one.
        if let Some(recent) = self
            .repos
            .sessions()
            .find_for_charge_point(charge_point_id)
            .await?
            .into_iter()
            .filter(|s| s.evse_id == connector_id && s.id_tag == id_tag)
            .max_by_key(|s| s.start_time)
        {
            if (at - recent.start_time).abs() < Duration::seconds(DUPLICATE_START_WINDOW_SECS) {
                return Ok(StartOutcome {
                    session: recent,
                    created: false,
                });
            }
        }

        // StartTransaction can arrive before BootNotification; make
        // sure the owning rows exist.
        if self
            .repos
            .charge_points()
            .find_by_id(charge_point_id)
            .await?
            .is_none()
        {
            self.repos
                .charge_points()
                .save(ChargePoint::new(charge_point_id))
                .await?;
        }
        self.repos.evses().ensure(charge_point_id, connector_id).await?;

        let session = self
            .repos
            .sessions()
            .create(ChargingSession {
                transaction_id: 0,
                charge_point_id: charge_point_id.to_string(),
                evse_id: connector_id,
                id_tag: id_tag.to_string(),
                user_id: None,
                start_time: Utc::now(),
                end_time: None,
                meter_start,
                meter_stop: None,
                status: SessionStatus::Active,
                stop_reason: None,
            })
            .await?;

        self.repos
            .evses()
            .set_status(EvseStatus::new(charge_point_id, connector_id, EvseState::Charging))
            .await?;

        self.log_event(
            charge_point_id,
            None,
            DeviceEventType::TransactionStart,
            Some(json!({
                "transactionId": session.transaction_id,
                "connectorId": connector_id,
                "idTag": id_tag,
                "meterStart": meter_start,
            })),
        )
        .await?;

        info!(
            charge_point_id,
            connector_id,
            transaction_id = session.transaction_id,
            "Transaction started"
        );

        Ok(StartOutcome {
            session,
            created: true,
        })
    }

    // ── StopTransaction ────────────────────────────────────

    /// Close a charging session, idempotently. A session that is
    /// already Completed is returned untouched.
    pub async fn stop_transaction(
        &self,
        transaction_id: i32,
        meter_stop: i32,
        at: DateTime<Utc>,
        reason: Option<String>,
        samples: Vec<MeterValueSample>,
    ) -> DomainResult<StopOutcome> {
        let mut session = self
            .repos
            .sessions()
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("ChargingSession", "transaction_id", transaction_id.to_string())
            })?;

        if session.status == SessionStatus::Completed {
            return Ok(StopOutcome {
                session,
                already_completed: true,
            });
        }

        if meter_stop < session.meter_start {
            return Err(DomainError::Validation(format!(
                "meterStop {} below meterStart {}",
                meter_stop, session.meter_start
            )));
        }

        let end_time = if at >= session.start_time { at } else { Utc::now() };
        session.end_time = Some(end_time);
        session.meter_stop = Some(meter_stop);
        session.status = SessionStatus::Completed;
        session.stop_reason = reason.clone();
        self.repos.sessions().update(session.clone()).await?;

        for sample in samples {
            self.repos
                .sessions()
                .append_meter_value(MeterValueSample {
                    transaction_id,
                    ..sample
                })
                .await?;
        }

        // Back to Available unless a later StatusNotification already
        // moved the connector on; the timestamp guard decides.
        self.repos
            .evses()
            .set_status(EvseStatus::new(
                &session.charge_point_id,
                session.evse_id,
                EvseState::Available,
            ))
            .await?;

        self.log_event(
            &session.charge_point_id,
            None,
            DeviceEventType::TransactionStop,
            Some(json!({
                "transactionId": transaction_id,
                "meterStop": meter_stop,
                "reason": reason,
            })),
        )
        .await?;

        info!(
            charge_point_id = session.charge_point_id.as_str(),
            transaction_id,
            energy_wh = session.energy_wh(),
            "Transaction stopped"
        );

        Ok(StopOutcome {
            session,
            already_completed: false,
        })
    }

    // ── MeterValues ────────────────────────────────────────

    /// Append samples to the referenced session, or to the EVSE's
    /// active session when no transactionId was given. Samples with no
    /// resolvable session are dropped.
    pub async fn record_meter_values(
        &self,
        charge_point_id: &str,
        connector_id: i32,
        transaction_id: Option<i32>,
        samples: Vec<MeterValueSample>,
    ) -> DomainResult<usize> {
        let session = match transaction_id {
            Some(tx_id) => self.repos.sessions().find_by_transaction_id(tx_id).await?,
            None => {
                self.repos
                    .sessions()
                    .find_active_for_evse(charge_point_id, connector_id)
                    .await?
            }
        };

        let Some(session) = session else {
            info!(
                charge_point_id,
                connector_id,
                ?transaction_id,
                "MeterValues without a resolvable session, dropping"
            );
            return Ok(0);
        };

        let count = samples.len();
        for sample in samples {
            self.repos
                .sessions()
                .append_meter_value(MeterValueSample {
                    transaction_id: session.transaction_id,
                    ..sample
                })
                .await?;
        }
        Ok(count)
    }

    // ── Audit log ──────────────────────────────────────────

    async fn log_event(
        &self,
        charge_point_id: &str,
        device_serial_number: Option<&str>,
        event_type: DeviceEventType,
        details: Option<serde_json::Value>,
    ) -> DomainResult<()> {
        self.repos
            .device_events()
            .append(DeviceEvent {
                id: 0,
                charge_point_id: charge_point_id.to_string(),
                device_serial_number: device_serial_number.map(String::from),
                event_type: event_type.as_str().to_string(),
                timestamp: Utc::now(),
                details: details.map(|d| d.to_string()),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn service() -> (Arc<InMemoryRepositoryProvider>, ChargePointService) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let provider: Arc<dyn RepositoryProvider> = repos.clone();
        (repos, ChargePointService::new(provider))
    }

    #[tokio::test]
    async fn stale_status_update_is_ignored() {
        let (repos, service) = service();

        let newer = Utc::now();
        service
            .update_evse_status("CP1", 1, EvseState::Charging, None, newer)
            .await
            .unwrap();

        // A status carrying an older timestamp must not win.
        service
            .update_evse_status(
                "CP1",
                1,
                EvseState::Preparing,
                None,
                newer - Duration::seconds(30),
            )
            .await
            .unwrap();

        let status = repos.evses().get_status("CP1", 1).await.unwrap().unwrap();
        assert_eq!(status.status, EvseState::Charging);
    }

    #[tokio::test]
    async fn stop_rejects_meter_stop_below_meter_start() {
        let (_repos, service) = service();

        let outcome = service
            .start_transaction("CP1", 1, "TAG_1", 500, Utc::now())
            .await
            .unwrap();

        let err = service
            .stop_transaction(outcome.session.transaction_id, 100, Utc::now(), None, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        // The session stays Active after the rejected stop.
        let session = service
            .repos()
            .sessions()
            .find_by_transaction_id(outcome.session.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn meter_values_without_session_are_dropped() {
        let (repos, service) = service();

        let appended = service
            .record_meter_values(
                "CP1",
                1,
                None,
                vec![MeterValueSample {
                    id: 0,
                    transaction_id: 0,
                    timestamp: Utc::now(),
                    measurand: "Energy.Active.Import.Register".into(),
                    value: "1000".into(),
                    unit: Some("Wh".into()),
                }],
            )
            .await
            .unwrap();
        assert_eq!(appended, 0);
        assert!(repos
            .sessions()
            .meter_values_for_transaction(0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn one_active_session_per_evse() {
        let (repos, service) = service();

        let first = service
            .start_transaction("CP1", 1, "TAG_1", 0, Utc::now())
            .await
            .unwrap();
        assert!(first.created);

        // A second start on the same EVSE (different tag) resolves to
        // the running session instead of opening another.
        let second = service
            .start_transaction("CP1", 1, "TAG_2", 0, Utc::now())
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(
            second.session.transaction_id,
            first.session.transaction_id
        );

        // A different EVSE gets its own session with a larger id.
        let other = service
            .start_transaction("CP1", 2, "TAG_1", 0, Utc::now())
            .await
            .unwrap();
        assert!(other.created);
        assert!(other.session.transaction_id > first.session.transaction_id);

        let sessions = repos.sessions().find_for_charge_point("CP1").await.unwrap();
        assert_eq!(sessions.len(), 2);
    }
}
