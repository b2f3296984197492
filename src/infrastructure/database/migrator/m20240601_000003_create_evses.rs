//! Create evses table

use sea_orm_migration::prelude::*;

use super::m20240601_000002_create_charge_points::ChargePoints;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Evses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Evses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Evses::ChargePointId).string().not_null())
                    .col(ColumnDef::new(Evses::EvseId).integer().not_null())
                    .col(ColumnDef::new(Evses::ConnectorType).string())
                    .col(ColumnDef::new(Evses::MaxPowerKw).double())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_evses_charge_point")
                            .from(Evses::Table, Evses::ChargePointId)
                            .to(ChargePoints::Table, ChargePoints::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_evses_charge_point_evse")
                    .table(Evses::Table)
                    .col(Evses::ChargePointId)
                    .col(Evses::EvseId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Evses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Evses {
    Table,
    Id,
    ChargePointId,
    EvseId,
    ConnectorType,
    MaxPowerKw,
}
