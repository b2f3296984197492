//! EVSE status entity

use sea_orm::entity::prelude::*;

/// Current liveness/availability of one EVSE. Exactly one row per
/// `(charge_point_id, evse_id)`; `evse_id = 0` is the synthetic
/// whole-station row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evse_statuses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub charge_point_id: String,

    pub evse_id: i32,

    /// OCPP 1.6 status vocabulary (Available, Charging, Faulted, ...)
    pub status: String,

    #[sea_orm(nullable)]
    pub error_code: Option<String>,

    pub last_seen: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
