//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::{
    ChargePointRepository, DeviceEventRepository, DeviceRepository, EvseRepository,
    IdTagRepository, OrderRepository, RepositoryProvider, SessionRepository, SiteRepository,
    TariffRepository,
};

use super::charge_point_repository::SeaOrmChargePointRepository;
use super::device_repository::{SeaOrmDeviceEventRepository, SeaOrmDeviceRepository};
use super::evse_repository::SeaOrmEvseRepository;
use super::id_tag_repository::SeaOrmIdTagRepository;
use super::session_repository::SeaOrmSessionRepository;
use super::site_repository::SeaOrmSiteRepository;
use super::tariff_repository::{SeaOrmOrderRepository, SeaOrmTariffRepository};

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository
/// accessors.
pub struct SeaOrmRepositoryProvider {
    sites: SeaOrmSiteRepository,
    charge_points: SeaOrmChargePointRepository,
    evses: SeaOrmEvseRepository,
    devices: SeaOrmDeviceRepository,
    device_events: SeaOrmDeviceEventRepository,
    sessions: SeaOrmSessionRepository,
    tariffs: SeaOrmTariffRepository,
    orders: SeaOrmOrderRepository,
    id_tags: SeaOrmIdTagRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            sites: SeaOrmSiteRepository::new(db.clone()),
            charge_points: SeaOrmChargePointRepository::new(db.clone()),
            evses: SeaOrmEvseRepository::new(db.clone()),
            devices: SeaOrmDeviceRepository::new(db.clone()),
            device_events: SeaOrmDeviceEventRepository::new(db.clone()),
            sessions: SeaOrmSessionRepository::new(db.clone()),
            tariffs: SeaOrmTariffRepository::new(db.clone()),
            orders: SeaOrmOrderRepository::new(db.clone()),
            id_tags: SeaOrmIdTagRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn sites(&self) -> &dyn SiteRepository {
        &self.sites
    }

    fn charge_points(&self) -> &dyn ChargePointRepository {
        &self.charge_points
    }

    fn evses(&self) -> &dyn EvseRepository {
        &self.evses
    }

    fn devices(&self) -> &dyn DeviceRepository {
        &self.devices
    }

    fn device_events(&self) -> &dyn DeviceEventRepository {
        &self.device_events
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }

    fn tariffs(&self) -> &dyn TariffRepository {
        &self.tariffs
    }

    fn orders(&self) -> &dyn OrderRepository {
        &self.orders
    }

    fn id_tags(&self) -> &dyn IdTagRepository {
        &self.id_tags
    }
}
