//! Meter value entity (append-only samples)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "meter_values")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub transaction_id: i32,

    pub timestamp: DateTimeUtc,

    /// OCPP measurand, e.g. `Energy.Active.Import.Register`.
    pub measurand: String,

    /// Raw value string as sent on the wire.
    pub value: String,

    #[sea_orm(nullable)]
    pub unit: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_session::Entity",
        from = "Column::TransactionId",
        to = "super::charging_session::Column::TransactionId"
    )]
    Session,
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
