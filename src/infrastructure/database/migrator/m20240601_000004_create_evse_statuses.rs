//! Create evse_statuses table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EvseStatuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EvseStatuses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EvseStatuses::ChargePointId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EvseStatuses::EvseId).integer().not_null())
                    .col(
                        ColumnDef::new(EvseStatuses::Status)
                            .string()
                            .not_null()
                            .default("Unknown"),
                    )
                    .col(ColumnDef::new(EvseStatuses::ErrorCode).string())
                    .col(
                        ColumnDef::new(EvseStatuses::LastSeen)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Exactly one status row per EVSE (plus the station row 0)
        manager
            .create_index(
                Index::create()
                    .name("idx_evse_statuses_charge_point_evse")
                    .table(EvseStatuses::Table)
                    .col(EvseStatuses::ChargePointId)
                    .col(EvseStatuses::EvseId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EvseStatuses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum EvseStatuses {
    Table,
    Id,
    ChargePointId,
    EvseId,
    Status,
    ErrorCode,
    LastSeen,
}
