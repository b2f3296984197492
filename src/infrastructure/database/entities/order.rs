//! Order entity (derived financial record)

use sea_orm::entity::prelude::*;

/// Written once when a session closes, snapshotting the active
/// tariff. Settlement happens outside this system.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub transaction_id: i32,

    pub charge_point_id: String,

    pub energy_kwh: f64,

    /// Price per kWh at session close.
    pub price_per_kwh: f64,

    pub amount: f64,

    pub currency: String,

    #[sea_orm(nullable)]
    pub tariff_id: Option<i32>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
