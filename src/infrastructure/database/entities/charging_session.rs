//! Charging session entity

use sea_orm::entity::prelude::*;

/// One charging transaction. The auto-increment primary key doubles
/// as the OCPP transactionId, making ids monotonic per installation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "charging_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub transaction_id: i32,

    pub charge_point_id: String,

    pub evse_id: i32,

    pub id_tag: String,

    #[sea_orm(nullable)]
    pub user_id: Option<String>,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeUtc>,

    /// Meter reading at start (Wh).
    pub meter_start: i32,

    /// Meter reading at stop (Wh).
    #[sea_orm(nullable)]
    pub meter_stop: Option<i32>,

    /// Active, Completed, Aborted
    pub status: String,

    #[sea_orm(nullable)]
    pub stop_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charge_point::Entity",
        from = "Column::ChargePointId",
        to = "super::charge_point::Column::Id"
    )]
    ChargePoint,
    #[sea_orm(has_many = "super::meter_value::Entity")]
    MeterValues,
}

impl Related<super::charge_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePoint.def()
    }
}

impl Related<super::meter_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeterValues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
