//! SeaORM implementation of SessionRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{
    ChargingSession, DomainResult, MeterValueSample, SessionRepository, SessionStatus,
};
use crate::infrastructure::database::entities::{charging_session, meter_value};

use super::db_err;

pub struct SeaOrmSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn session_to_domain(m: charging_session::Model) -> ChargingSession {
    ChargingSession {
        transaction_id: m.transaction_id,
        charge_point_id: m.charge_point_id,
        evse_id: m.evse_id,
        id_tag: m.id_tag,
        user_id: m.user_id,
        start_time: m.start_time,
        end_time: m.end_time,
        meter_start: m.meter_start,
        meter_stop: m.meter_stop,
        status: SessionStatus::from_str(&m.status),
        stop_reason: m.stop_reason,
    }
}

fn sample_to_domain(m: meter_value::Model) -> MeterValueSample {
    MeterValueSample {
        id: m.id,
        transaction_id: m.transaction_id,
        timestamp: m.timestamp,
        measurand: m.measurand,
        value: m.value,
        unit: m.unit,
    }
}

// ── SessionRepository impl ──────────────────────────────────────

#[async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn create(&self, session: ChargingSession) -> DomainResult<ChargingSession> {
        let inserted = charging_session::ActiveModel {
            charge_point_id: Set(session.charge_point_id),
            evse_id: Set(session.evse_id),
            id_tag: Set(session.id_tag),
            user_id: Set(session.user_id),
            start_time: Set(session.start_time),
            end_time: Set(session.end_time),
            meter_start: Set(session.meter_start),
            meter_stop: Set(session.meter_stop),
            status: Set(session.status.as_str().to_string()),
            stop_reason: Set(session.stop_reason),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(session_to_domain(inserted))
    }

    async fn update(&self, session: ChargingSession) -> DomainResult<()> {
        charging_session::ActiveModel {
            transaction_id: Set(session.transaction_id),
            charge_point_id: Set(session.charge_point_id),
            evse_id: Set(session.evse_id),
            id_tag: Set(session.id_tag),
            user_id: Set(session.user_id),
            start_time: Set(session.start_time),
            end_time: Set(session.end_time),
            meter_start: Set(session.meter_start),
            meter_stop: Set(session.meter_stop),
            status: Set(session.status.as_str().to_string()),
            stop_reason: Set(session.stop_reason),
        }
        .update(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargingSession>> {
        Ok(charging_session::Entity::find_by_id(transaction_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(session_to_domain))
    }

    async fn find_active_for_evse(
        &self,
        charge_point_id: &str,
        evse_id: i32,
    ) -> DomainResult<Option<ChargingSession>> {
        Ok(charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::EvseId.eq(evse_id))
            .filter(charging_session::Column::Status.eq(SessionStatus::Active.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(session_to_domain))
    }

    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<ChargingSession>> {
        Ok(charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .order_by_desc(charging_session::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(session_to_domain)
            .collect())
    }

    async fn append_meter_value(&self, sample: MeterValueSample) -> DomainResult<()> {
        meter_value::ActiveModel {
            transaction_id: Set(sample.transaction_id),
            timestamp: Set(sample.timestamp),
            measurand: Set(sample.measurand),
            value: Set(sample.value),
            unit: Set(sample.unit),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn meter_values_for_transaction(
        &self,
        transaction_id: i32,
    ) -> DomainResult<Vec<MeterValueSample>> {
        Ok(meter_value::Entity::find()
            .filter(meter_value::Column::TransactionId.eq(transaction_id))
            .order_by_asc(meter_value::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(sample_to_domain)
            .collect())
    }
}
