//! Create orders table

use sea_orm_migration::prelude::*;

use super::m20240601_000007_create_charging_sessions::ChargingSessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::TransactionId).integer().not_null())
                    .col(ColumnDef::new(Orders::ChargePointId).string().not_null())
                    .col(ColumnDef::new(Orders::EnergyKwh).double().not_null())
                    .col(ColumnDef::new(Orders::PricePerKwh).double().not_null())
                    .col(ColumnDef::new(Orders::Amount).double().not_null())
                    .col(ColumnDef::new(Orders::Currency).string().not_null())
                    .col(ColumnDef::new(Orders::TariffId).integer())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_session")
                            .from(Orders::Table, Orders::TransactionId)
                            .to(ChargingSessions::Table, ChargingSessions::TransactionId)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // One order per completed session
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_transaction")
                    .table(Orders::Table)
                    .col(Orders::TransactionId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Orders {
    Table,
    Id,
    TransactionId,
    ChargePointId,
    EnergyKwh,
    PricePerKwh,
    Amount,
    Currency,
    TariffId,
    CreatedAt,
}
