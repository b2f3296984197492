//! Create tariffs table

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
                    .table(Tariffs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tariffs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tariffs::SiteId).string())
                    .col(ColumnDef::new(Tariffs::Name).string().not_null())
                    .col(
                        ColumnDef::new(Tariffs::BasePricePerKwh)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tariffs::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Tariffs::ValidFrom)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Tariffs::ValidUntil).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Tariffs::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tariffs_site")
                            .from(Tariffs::Table, Tariffs::SiteId)
                            .to(Sites::Table, Sites::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tariffs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Tariffs {
    Table,
    Id,
    SiteId,
    Name,
    BasePricePerKwh,
    Currency,
    ValidFrom,
    ValidUntil,
    IsActive,
}
