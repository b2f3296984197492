//! Create charge_points table

use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_sites::Sites;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargePoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargePoints::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargePoints::SiteId).string())
                    .col(ColumnDef::new(ChargePoints::Vendor).string())
                    .col(ColumnDef::new(ChargePoints::Model).string())
                    .col(ColumnDef::new(ChargePoints::SerialNumber).string())
                    .col(ColumnDef::new(ChargePoints::FirmwareVersion).string())
                    .col(ColumnDef::new(ChargePoints::DeviceSerialNumber).string())
                    .col(
                        ColumnDef::new(ChargePoints::Registration)
                            .string()
                            .not_null()
                            .default("Unknown"),
                    )
                    .col(ColumnDef::new(ChargePoints::LastSeen).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ChargePoints::RegisteredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargePoints::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charge_points_site")
                            .from(ChargePoints::Table, ChargePoints::SiteId)
                            .to(Sites::Table, Sites::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charge_points_serial")
                    .table(ChargePoints::Table)
                    .col(ChargePoints::SerialNumber)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargePoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargePoints {
    Table,
    Id,
    SiteId,
    Vendor,
    Model,
    SerialNumber,
    FirmwareVersion,
    DeviceSerialNumber,
    Registration,
    LastSeen,
    RegisteredAt,
    UpdatedAt,
}
