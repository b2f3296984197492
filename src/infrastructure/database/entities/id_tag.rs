//! IdTag entity (authorization token store)

use sea_orm::entity::prelude::*;

/// An authorization token. An empty table means accept-all.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "id_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id_tag: String,

    pub is_active: bool,

    #[sea_orm(nullable)]
    pub expiry_date: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub parent_id_tag: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
