//! Create id_tags table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IdTags::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IdTags::IdTag)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IdTags::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(IdTags::ExpiryDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(IdTags::ParentIdTag).string())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IdTags::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum IdTags {
    Table,
    IdTag,
    IsActive,
    ExpiryDate,
    ParentIdTag,
}
