//! Create devices table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::SerialNumber)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::TypeCode).string().not_null())
                    .col(ColumnDef::new(Devices::MqttClientId).string().not_null())
                    .col(ColumnDef::new(Devices::MqttUsername).string().not_null())
                    .col(
                        ColumnDef::new(Devices::MasterSecretEnc)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Devices::EncryptionAlgorithm)
                            .string()
                            .not_null()
                            .default("AES-256-GCM"),
                    )
                    .col(
                        ColumnDef::new(Devices::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Devices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Devices {
    Table,
    SerialNumber,
    TypeCode,
    MqttClientId,
    MqttUsername,
    MasterSecretEnc,
    EncryptionAlgorithm,
    IsActive,
    CreatedAt,
}
