//! Repository traits for the domain layer
//!
//! `RepositoryProvider` gives unified access to all per-aggregate
//! repositories. Handlers and services never touch a concrete store;
//! production wires SeaORM, tests wire the in-memory provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::DomainResult;
use super::models::{
    ChargePoint, ChargingSession, Device, DeviceEvent, Evse, EvseStatus, IdTag, MeterValueSample,
    Order, Site, Tariff,
};

// ── Per-aggregate repositories ──────────────────────────────────

#[async_trait]
pub trait SiteRepository: Send + Sync {
    async fn save(&self, site: Site) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Site>>;
    async fn find_all(&self) -> DomainResult<Vec<Site>>;
}

#[async_trait]
pub trait ChargePointRepository: Send + Sync {
    async fn save(&self, charge_point: ChargePoint) -> DomainResult<()>;
    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargePoint>>;
    async fn find_by_serial(&self, serial_number: &str) -> DomainResult<Option<ChargePoint>>;
    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>>;
    /// Update `last_seen` without rewriting the whole row.
    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()>;
}

#[async_trait]
pub trait EvseRepository: Send + Sync {
    /// Create the EVSE if `(charge_point_id, evse_id)` does not exist.
    async fn ensure(&self, charge_point_id: &str, evse_id: i32) -> DomainResult<Evse>;
    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Evse>>;

    /// Upsert the status row for `(charge_point_id, evse_id)`.
    ///
    /// Last-writer-wins by timestamp: an update older than the stored
    /// row must be ignored.
    async fn set_status(&self, status: EvseStatus) -> DomainResult<()>;
    async fn get_status(
        &self,
        charge_point_id: &str,
        evse_id: i32,
    ) -> DomainResult<Option<EvseStatus>>;
    async fn statuses_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<EvseStatus>>;
}

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn save(&self, device: Device) -> DomainResult<()>;
    async fn find_by_serial(&self, serial_number: &str) -> DomainResult<Option<Device>>;
    async fn set_active(&self, serial_number: &str, is_active: bool) -> DomainResult<()>;
}

#[async_trait]
pub trait DeviceEventRepository: Send + Sync {
    /// Append one event to the audit log. Append-only; events are
    /// never updated or deleted.
    async fn append(&self, event: DeviceEvent) -> DomainResult<()>;
    async fn recent_for_charge_point(
        &self,
        charge_point_id: &str,
        limit: u64,
    ) -> DomainResult<Vec<DeviceEvent>>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a new Active session and return it with its assigned
    /// transaction id (monotonic per installation).
    async fn create(&self, session: ChargingSession) -> DomainResult<ChargingSession>;
    async fn update(&self, session: ChargingSession) -> DomainResult<()>;
    async fn find_by_transaction_id(
        &self,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargingSession>>;
    async fn find_active_for_evse(
        &self,
        charge_point_id: &str,
        evse_id: i32,
    ) -> DomainResult<Option<ChargingSession>>;
    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<ChargingSession>>;

    async fn append_meter_value(&self, sample: MeterValueSample) -> DomainResult<()>;
    async fn meter_values_for_transaction(
        &self,
        transaction_id: i32,
    ) -> DomainResult<Vec<MeterValueSample>>;
}

#[async_trait]
pub trait TariffRepository: Send + Sync {
    async fn save(&self, tariff: Tariff) -> DomainResult<Tariff>;
    /// The tariff in effect for a site at the given instant (falls
    /// back to the installation-wide tariff with `site_id = None`).
    async fn active_for_site(
        &self,
        site_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Tariff>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: Order) -> DomainResult<()>;
    async fn find_by_transaction_id(&self, transaction_id: i32) -> DomainResult<Option<Order>>;
}

#[async_trait]
pub trait IdTagRepository: Send + Sync {
    async fn find(&self, id_tag: &str) -> DomainResult<Option<IdTag>>;
    async fn save(&self, id_tag: IdTag) -> DomainResult<()>;
    /// Number of tokens in the store. Zero means the accept-all
    /// authorization policy applies.
    async fn count(&self) -> DomainResult<u64>;
}

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) -> DomainResult<()> {
///     let cp = repos.charge_points().find_by_id("CP001").await?;
///     let active = repos.sessions().find_active_for_evse("CP001", 1).await?;
///     Ok(())
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn sites(&self) -> &dyn SiteRepository;
    fn charge_points(&self) -> &dyn ChargePointRepository;
    fn evses(&self) -> &dyn EvseRepository;
    fn devices(&self) -> &dyn DeviceRepository;
    fn device_events(&self) -> &dyn DeviceEventRepository;
    fn sessions(&self) -> &dyn SessionRepository;
    fn tariffs(&self) -> &dyn TariffRepository;
    fn orders(&self) -> &dyn OrderRepository;
    fn id_tags(&self) -> &dyn IdTagRepository;
}

/// Helper for status upserts: `true` when `incoming` should replace
/// `stored` under last-writer-wins ordering.
pub fn status_supersedes(stored: Option<&EvseStatus>, incoming: &EvseStatus) -> bool {
    match stored {
        Some(existing) => incoming.last_seen >= existing.last_seen,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EvseState;
    use chrono::Duration;

    #[test]
    fn status_last_writer_wins() {
        let older = EvseStatus {
            charge_point_id: "CP1".into(),
            evse_id: 1,
            status: EvseState::Available,
            error_code: None,
            last_seen: Utc::now() - Duration::seconds(10),
        };
        let newer = EvseStatus {
            last_seen: Utc::now(),
            ..older.clone()
        };

        assert!(status_supersedes(None, &older));
        assert!(status_supersedes(Some(&older), &newer));
        assert!(!status_supersedes(Some(&newer), &older));
    }
}
