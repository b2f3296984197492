//! Device entity

use sea_orm::entity::prelude::*;

/// The credentialed physical unit behind a charge point.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub serial_number: String,

    pub type_code: String,

    /// Canonically `"{type_code}&{serial_number}"`.
    pub mqtt_client_id: String,

    pub mqtt_username: String,

    /// Sealed master secret, base64(nonce || ciphertext).
    pub master_secret_enc: String,

    pub encryption_algorithm: String,

    pub is_active: bool,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
