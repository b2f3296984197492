//! EVSE entity

use sea_orm::entity::prelude::*;

/// One socket/connector. `(charge_point_id, evse_id)` is unique;
/// `evse_id` is the 1-based index within the charge point.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub charge_point_id: String,

    pub evse_id: i32,

    #[sea_orm(nullable)]
    pub connector_type: Option<String>,

    #[sea_orm(nullable)]
    pub max_power_kw: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charge_point::Entity",
        from = "Column::ChargePointId",
        to = "super::charge_point::Column::Id"
    )]
    ChargePoint,
}

impl Related<super::charge_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
