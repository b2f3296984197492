//! Tariff entity

use sea_orm::entity::prelude::*;

/// Pricing rule, per site or installation-wide (`site_id` null).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tariffs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub site_id: Option<String>,

    pub name: String,

    pub base_price_per_kwh: f64,

    pub currency: String,

    pub valid_from: DateTimeUtc,

    #[sea_orm(nullable)]
    pub valid_until: Option<DateTimeUtc>,

    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
