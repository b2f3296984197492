//! Device event entity (append-only audit log)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "device_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub charge_point_id: String,

    #[sea_orm(nullable)]
    pub device_serial_number: Option<String>,

    /// boot, heartbeat, status_change, transaction_start,
    /// transaction_stop, error
    pub event_type: String,

    pub timestamp: DateTimeUtc,

    /// JSON blob with event-specific detail.
    #[sea_orm(nullable)]
    pub details: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
