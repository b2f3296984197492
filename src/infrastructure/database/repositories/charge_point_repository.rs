//! SeaORM implementation of ChargePointRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::domain::{
    ChargePoint, ChargePointRepository, DomainError, DomainResult, RegistrationState,
};
use crate::infrastructure::database::entities::charge_point;

use super::db_err;

pub struct SeaOrmChargePointRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargePointRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: charge_point::Model) -> ChargePoint {
    ChargePoint {
        id: m.id,
        site_id: m.site_id,
        vendor: m.vendor,
        model: m.model,
        serial_number: m.serial_number,
        firmware_version: m.firmware_version,
        device_serial_number: m.device_serial_number,
        registration: RegistrationState::from_str(&m.registration),
        last_seen: m.last_seen,
        registered_at: m.registered_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(cp: ChargePoint) -> charge_point::ActiveModel {
    charge_point::ActiveModel {
        id: Set(cp.id),
        site_id: Set(cp.site_id),
        vendor: Set(cp.vendor),
        model: Set(cp.model),
        serial_number: Set(cp.serial_number),
        firmware_version: Set(cp.firmware_version),
        device_serial_number: Set(cp.device_serial_number),
        registration: Set(cp.registration.as_str().to_string()),
        last_seen: Set(cp.last_seen),
        registered_at: Set(cp.registered_at),
        updated_at: Set(cp.updated_at),
    }
}

// ── ChargePointRepository impl ──────────────────────────────────

#[async_trait]
impl ChargePointRepository for SeaOrmChargePointRepository {
    async fn save(&self, charge_point: ChargePoint) -> DomainResult<()> {
        domain_to_active(charge_point)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()> {
        domain_to_active(charge_point)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargePoint>> {
        Ok(charge_point::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain))
    }

    async fn find_by_serial(&self, serial_number: &str) -> DomainResult<Option<ChargePoint>> {
        Ok(charge_point::Entity::find()
            .filter(charge_point::Column::SerialNumber.eq(serial_number))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>> {
        Ok(charge_point::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect())
    }

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let existing = charge_point::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("ChargePoint", "id", id))?;

        let mut active: charge_point::ActiveModel = existing.into();
        active.last_seen = Set(Some(at));
        active.updated_at = Set(Some(at));
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
