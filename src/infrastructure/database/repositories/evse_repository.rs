//! SeaORM implementation of EvseRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{
    status_supersedes, DomainResult, Evse, EvseRepository, EvseState, EvseStatus,
};
use crate::infrastructure::database::entities::{evse, evse_status};

use super::db_err;

pub struct SeaOrmEvseRepository {
    db: DatabaseConnection,
}

impl SeaOrmEvseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn evse_to_domain(m: evse::Model) -> Evse {
    Evse {
        id: m.id,
        charge_point_id: m.charge_point_id,
        evse_id: m.evse_id,
        connector_type: m.connector_type,
        max_power_kw: m.max_power_kw,
    }
}

fn status_to_domain(m: evse_status::Model) -> EvseStatus {
    EvseStatus {
        charge_point_id: m.charge_point_id,
        evse_id: m.evse_id,
        status: EvseState::from_str(&m.status),
        error_code: m.error_code,
        last_seen: m.last_seen,
    }
}

// ── EvseRepository impl ─────────────────────────────────────────

#[async_trait]
impl EvseRepository for SeaOrmEvseRepository {
    async fn ensure(&self, charge_point_id: &str, evse_id: i32) -> DomainResult<Evse> {
        if let Some(existing) = evse::Entity::find()
            .filter(evse::Column::ChargePointId.eq(charge_point_id))
            .filter(evse::Column::EvseId.eq(evse_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
        {
            return Ok(evse_to_domain(existing));
        }

        let inserted = evse::ActiveModel {
            charge_point_id: Set(charge_point_id.to_string()),
            evse_id: Set(evse_id),
            connector_type: Set(None),
            max_power_kw: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(evse_to_domain(inserted))
    }

    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Evse>> {
        Ok(evse::Entity::find()
            .filter(evse::Column::ChargePointId.eq(charge_point_id))
            .order_by_asc(evse::Column::EvseId)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(evse_to_domain)
            .collect())
    }

    async fn set_status(&self, status: EvseStatus) -> DomainResult<()> {
        let existing = evse_status::Entity::find()
            .filter(evse_status::Column::ChargePointId.eq(status.charge_point_id.as_str()))
            .filter(evse_status::Column::EvseId.eq(status.evse_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        // Last-writer-wins by timestamp: stale updates are ignored.
        let stored = existing.clone().map(status_to_domain);
        if !status_supersedes(stored.as_ref(), &status) {
            return Ok(());
        }

        match existing {
            Some(row) => {
                let mut active: evse_status::ActiveModel = row.into();
                active.status = Set(status.status.as_str().to_string());
                active.error_code = Set(status.error_code);
                active.last_seen = Set(status.last_seen);
                active.update(&self.db).await.map_err(db_err)?;
            }
            None => {
                evse_status::ActiveModel {
                    charge_point_id: Set(status.charge_point_id),
                    evse_id: Set(status.evse_id),
                    status: Set(status.status.as_str().to_string()),
                    error_code: Set(status.error_code),
                    last_seen: Set(status.last_seen),
                    ..Default::default()
                }
                .insert(&self.db)
                .await
                .map_err(db_err)?;
            }
        }
        Ok(())
    }

    async fn get_status(
        &self,
        charge_point_id: &str,
        evse_id: i32,
    ) -> DomainResult<Option<EvseStatus>> {
        Ok(evse_status::Entity::find()
            .filter(evse_status::Column::ChargePointId.eq(charge_point_id))
            .filter(evse_status::Column::EvseId.eq(evse_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(status_to_domain))
    }

    async fn statuses_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<EvseStatus>> {
        Ok(evse_status::Entity::find()
            .filter(evse_status::Column::ChargePointId.eq(charge_point_id))
            .order_by_asc(evse_status::Column::EvseId)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(status_to_domain)
            .collect())
    }
}
