//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_sites;
mod m20240601_000002_create_charge_points;
mod m20240601_000003_create_evses;
mod m20240601_000004_create_evse_statuses;
mod m20240601_000005_create_devices;
mod m20240601_000006_create_device_events;
mod m20240601_000007_create_charging_sessions;
mod m20240601_000008_create_meter_values;
mod m20240601_000009_create_tariffs;
mod m20240601_000010_create_orders;
mod m20240601_000011_create_id_tags;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_sites::Migration),
            Box::new(m20240601_000002_create_charge_points::Migration),
            Box::new(m20240601_000003_create_evses::Migration),
            Box::new(m20240601_000004_create_evse_statuses::Migration),
            Box::new(m20240601_000005_create_devices::Migration),
            Box::new(m20240601_000006_create_device_events::Migration),
            Box::new(m20240601_000007_create_charging_sessions::Migration),
            Box::new(m20240601_000008_create_meter_values::Migration),
            Box::new(m20240601_000009_create_tariffs::Migration),
            Box::new(m20240601_000010_create_orders::Migration),
            Box::new(m20240601_000011_create_id_tags::Migration),
        ]
    }
}
