//! SeaORM implementations of DeviceRepository and
//! DeviceEventRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::domain::{
    Device, DeviceEvent, DeviceEventRepository, DeviceRepository, DomainError, DomainResult,
};
use crate::infrastructure::database::entities::{device, device_event};

use super::db_err;

pub struct SeaOrmDeviceRepository {
    db: DatabaseConnection,
}

impl SeaOrmDeviceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn device_to_domain(m: device::Model) -> Device {
    Device {
        serial_number: m.serial_number,
        type_code: m.type_code,
        mqtt_client_id: m.mqtt_client_id,
        mqtt_username: m.mqtt_username,
        master_secret_enc: m.master_secret_enc,
        encryption_algorithm: m.encryption_algorithm,
        is_active: m.is_active,
        created_at: m.created_at,
    }
}

#[async_trait]
impl DeviceRepository for SeaOrmDeviceRepository {
    async fn save(&self, d: Device) -> DomainResult<()> {
        device::ActiveModel {
            serial_number: Set(d.serial_number),
            type_code: Set(d.type_code),
            mqtt_client_id: Set(d.mqtt_client_id),
            mqtt_username: Set(d.mqtt_username),
            master_secret_enc: Set(d.master_secret_enc),
            encryption_algorithm: Set(d.encryption_algorithm),
            is_active: Set(d.is_active),
            created_at: Set(d.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_serial(&self, serial_number: &str) -> DomainResult<Option<Device>> {
        Ok(device::Entity::find_by_id(serial_number)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(device_to_domain))
    }

    async fn set_active(&self, serial_number: &str, is_active: bool) -> DomainResult<()> {
        let existing = device::Entity::find_by_id(serial_number)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Device", "serial_number", serial_number))?;

        let mut active: device::ActiveModel = existing.into();
        active.is_active = Set(is_active);
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}

pub struct SeaOrmDeviceEventRepository {
    db: DatabaseConnection,
}

impl SeaOrmDeviceEventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceEventRepository for SeaOrmDeviceEventRepository {
    async fn append(&self, event: DeviceEvent) -> DomainResult<()> {
        device_event::ActiveModel {
            charge_point_id: Set(event.charge_point_id),
            device_serial_number: Set(event.device_serial_number),
            event_type: Set(event.event_type),
            timestamp: Set(event.timestamp),
            details: Set(event.details),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn recent_for_charge_point(
        &self,
        charge_point_id: &str,
        limit: u64,
    ) -> DomainResult<Vec<DeviceEvent>> {
        Ok(device_event::Entity::find()
            .filter(device_event::Column::ChargePointId.eq(charge_point_id))
            .order_by_desc(device_event::Column::Timestamp)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| DeviceEvent {
                id: m.id,
                charge_point_id: m.charge_point_id,
                device_serial_number: m.device_serial_number,
                event_type: m.event_type,
                timestamp: m.timestamp,
                details: m.details,
            })
            .collect())
    }
}
