//! In-memory repository provider
//!
//! Backs handler and service tests without a database. Mirrors the
//! SeaORM provider's semantics, including monotonic transaction ids
//! and last-writer-wins EVSE status upserts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{
    status_supersedes, ChargePoint, ChargePointRepository, ChargingSession, Device,
    DeviceEvent, DeviceEventRepository, DeviceRepository, DomainError, DomainResult, Evse,
    EvseRepository, EvseStatus, IdTag, IdTagRepository, MeterValueSample, Order, OrderRepository,
    RepositoryProvider, SessionRepository, SessionStatus, Site, SiteRepository, Tariff,
    TariffRepository,
};

#[derive(Default)]
struct Tables {
    sites: HashMap<String, Site>,
    charge_points: HashMap<String, ChargePoint>,
    evses: Vec<Evse>,
    evse_statuses: HashMap<(String, i32), EvseStatus>,
    devices: HashMap<String, Device>,
    device_events: Vec<DeviceEvent>,
    sessions: HashMap<i32, ChargingSession>,
    meter_values: Vec<MeterValueSample>,
    tariffs: Vec<Tariff>,
    orders: HashMap<i32, Order>,
    id_tags: HashMap<String, IdTag>,
}

/// All repositories over one in-process store.
pub struct InMemoryRepositoryProvider {
    tables: RwLock<Tables>,
    next_transaction_id: AtomicI32,
    next_evse_id: AtomicI32,
    next_event_id: AtomicI64,
    next_sample_id: AtomicI64,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_transaction_id: AtomicI32::new(1),
            next_evse_id: AtomicI32::new(1),
            next_event_id: AtomicI64::new(1),
            next_sample_id: AtomicI64::new(1),
        }
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn sites(&self) -> &dyn SiteRepository {
        self
    }
    fn charge_points(&self) -> &dyn ChargePointRepository {
        self
    }
    fn evses(&self) -> &dyn EvseRepository {
        self
    }
    fn devices(&self) -> &dyn DeviceRepository {
        self
    }
    fn device_events(&self) -> &dyn DeviceEventRepository {
        self
    }
    fn sessions(&self) -> &dyn SessionRepository {
        self
    }
    fn tariffs(&self) -> &dyn TariffRepository {
        self
    }
    fn orders(&self) -> &dyn OrderRepository {
        self
    }
    fn id_tags(&self) -> &dyn IdTagRepository {
        self
    }
}

#[async_trait]
impl SiteRepository for InMemoryRepositoryProvider {
    async fn save(&self, site: Site) -> DomainResult<()> {
        self.tables.write().await.sites.insert(site.id.clone(), site);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Site>> {
        Ok(self.tables.read().await.sites.get(id).cloned())
    }

    async fn find_all(&self) -> DomainResult<Vec<Site>> {
        Ok(self.tables.read().await.sites.values().cloned().collect())
    }
}

#[async_trait]
impl ChargePointRepository for InMemoryRepositoryProvider {
    async fn save(&self, charge_point: ChargePoint) -> DomainResult<()> {
        self.tables
            .write()
            .await
            .charge_points
            .insert(charge_point.id.clone(), charge_point);
        Ok(())
    }

    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.charge_points.contains_key(&charge_point.id) {
            return Err(DomainError::not_found(
                "ChargePoint",
                "id",
                charge_point.id.clone(),
            ));
        }
        tables
            .charge_points
            .insert(charge_point.id.clone(), charge_point);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargePoint>> {
        Ok(self.tables.read().await.charge_points.get(id).cloned())
    }

    async fn find_by_serial(&self, serial_number: &str) -> DomainResult<Option<ChargePoint>> {
        Ok(self
            .tables
            .read()
            .await
            .charge_points
            .values()
            .find(|cp| cp.serial_number.as_deref() == Some(serial_number))
            .cloned())
    }

    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>> {
        Ok(self
            .tables
            .read()
            .await
            .charge_points
            .values()
            .cloned()
            .collect())
    }

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(cp) = self.tables.write().await.charge_points.get_mut(id) {
            cp.last_seen = Some(at);
            cp.updated_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl EvseRepository for InMemoryRepositoryProvider {
    async fn ensure(&self, charge_point_id: &str, evse_id: i32) -> DomainResult<Evse> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .evses
            .iter()
            .find(|e| e.charge_point_id == charge_point_id && e.evse_id == evse_id)
        {
            return Ok(existing.clone());
        }

        let evse = Evse {
            id: self.next_evse_id.fetch_add(1, Ordering::SeqCst),
            charge_point_id: charge_point_id.to_string(),
            evse_id,
            connector_type: None,
            max_power_kw: None,
        };
        tables.evses.push(evse.clone());
        Ok(evse)
    }

    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Evse>> {
        Ok(self
            .tables
            .read()
            .await
            .evses
            .iter()
            .filter(|e| e.charge_point_id == charge_point_id)
            .cloned()
            .collect())
    }

    async fn set_status(&self, status: EvseStatus) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        let key = (status.charge_point_id.clone(), status.evse_id);
        if status_supersedes(tables.evse_statuses.get(&key), &status) {
            tables.evse_statuses.insert(key, status);
        }
        Ok(())
    }

    async fn get_status(
        &self,
        charge_point_id: &str,
        evse_id: i32,
    ) -> DomainResult<Option<EvseStatus>> {
        Ok(self
            .tables
            .read()
            .await
            .evse_statuses
            .get(&(charge_point_id.to_string(), evse_id))
            .cloned())
    }

    async fn statuses_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<EvseStatus>> {
        let mut statuses: Vec<EvseStatus> = self
            .tables
            .read()
            .await
            .evse_statuses
            .values()
            .filter(|s| s.charge_point_id == charge_point_id)
            .cloned()
            .collect();
        statuses.sort_by_key(|s| s.evse_id);
        Ok(statuses)
    }
}

#[async_trait]
impl DeviceRepository for InMemoryRepositoryProvider {
    async fn save(&self, device: Device) -> DomainResult<()> {
        self.tables
            .write()
            .await
            .devices
            .insert(device.serial_number.clone(), device);
        Ok(())
    }

    async fn find_by_serial(&self, serial_number: &str) -> DomainResult<Option<Device>> {
        Ok(self.tables.read().await.devices.get(serial_number).cloned())
    }

    async fn set_active(&self, serial_number: &str, is_active: bool) -> DomainResult<()> {
        match self.tables.write().await.devices.get_mut(serial_number) {
            Some(device) => {
                device.is_active = is_active;
                Ok(())
            }
            None => Err(DomainError::not_found(
                "Device",
                "serial_number",
                serial_number,
            )),
        }
    }
}

#[async_trait]
impl DeviceEventRepository for InMemoryRepositoryProvider {
    async fn append(&self, mut event: DeviceEvent) -> DomainResult<()> {
        event.id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        self.tables.write().await.device_events.push(event);
        Ok(())
    }

    async fn recent_for_charge_point(
        &self,
        charge_point_id: &str,
        limit: u64,
    ) -> DomainResult<Vec<DeviceEvent>> {
        let tables = self.tables.read().await;
        let mut events: Vec<DeviceEvent> = tables
            .device_events
            .iter()
            .filter(|e| e.charge_point_id == charge_point_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(limit as usize);
        Ok(events)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepositoryProvider {
    async fn create(&self, mut session: ChargingSession) -> DomainResult<ChargingSession> {
        session.transaction_id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);
        self.tables
            .write()
            .await
            .sessions
            .insert(session.transaction_id, session.clone());
        Ok(session)
    }

    async fn update(&self, session: ChargingSession) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(&session.transaction_id) {
            return Err(DomainError::not_found(
                "ChargingSession",
                "transaction_id",
                session.transaction_id.to_string(),
            ));
        }
        tables.sessions.insert(session.transaction_id, session);
        Ok(())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargingSession>> {
        Ok(self.tables.read().await.sessions.get(&transaction_id).cloned())
    }

    async fn find_active_for_evse(
        &self,
        charge_point_id: &str,
        evse_id: i32,
    ) -> DomainResult<Option<ChargingSession>> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .find(|s| {
                s.charge_point_id == charge_point_id
                    && s.evse_id == evse_id
                    && s.status == SessionStatus::Active
            })
            .cloned())
    }

    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<ChargingSession>> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.charge_point_id == charge_point_id)
            .cloned()
            .collect())
    }

    async fn append_meter_value(&self, mut sample: MeterValueSample) -> DomainResult<()> {
        sample.id = self.next_sample_id.fetch_add(1, Ordering::SeqCst);
        self.tables.write().await.meter_values.push(sample);
        Ok(())
    }

    async fn meter_values_for_transaction(
        &self,
        transaction_id: i32,
    ) -> DomainResult<Vec<MeterValueSample>> {
        Ok(self
            .tables
            .read()
            .await
            .meter_values
            .iter()
            .filter(|m| m.transaction_id == transaction_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TariffRepository for InMemoryRepositoryProvider {
    async fn save(&self, mut tariff: Tariff) -> DomainResult<Tariff> {
        let mut tables = self.tables.write().await;
        if tariff.id == 0 {
            tariff.id = tables.tariffs.len() as i32 + 1;
        }
        tables.tariffs.retain(|t| t.id != tariff.id);
        tables.tariffs.push(tariff.clone());
        Ok(tariff)
    }

    async fn active_for_site(
        &self,
        site_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Tariff>> {
        let tables = self.tables.read().await;
        let for_site = tables
            .tariffs
            .iter()
            .find(|t| t.site_id.as_deref() == site_id && t.is_valid_at(at));
        let fallback = tables
            .tariffs
            .iter()
            .find(|t| t.site_id.is_none() && t.is_valid_at(at));
        Ok(for_site.or(fallback).cloned())
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepositoryProvider {
    async fn create(&self, order: Order) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.transaction_id) {
            return Err(DomainError::Conflict(format!(
                "order for transaction {} already exists",
                order.transaction_id
            )));
        }
        tables.orders.insert(order.transaction_id, order);
        Ok(())
    }

    async fn find_by_transaction_id(&self, transaction_id: i32) -> DomainResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&transaction_id).cloned())
    }
}

#[async_trait]
impl IdTagRepository for InMemoryRepositoryProvider {
    async fn find(&self, id_tag: &str) -> DomainResult<Option<IdTag>> {
        Ok(self.tables.read().await.id_tags.get(id_tag).cloned())
    }

    async fn save(&self, id_tag: IdTag) -> DomainResult<()> {
        self.tables
            .write()
            .await
            .id_tags
            .insert(id_tag.id_tag.clone(), id_tag);
        Ok(())
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.tables.read().await.id_tags.len() as u64)
    }
}
