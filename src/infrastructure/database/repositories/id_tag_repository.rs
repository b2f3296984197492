//! SeaORM implementation of IdTagRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};

use crate::domain::{DomainResult, IdTag, IdTagRepository};
use crate::infrastructure::database::entities::id_tag;

use super::db_err;

pub struct SeaOrmIdTagRepository {
    db: DatabaseConnection,
}

impl SeaOrmIdTagRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdTagRepository for SeaOrmIdTagRepository {
    async fn find(&self, id_tag: &str) -> DomainResult<Option<IdTag>> {
        Ok(id_tag::Entity::find_by_id(id_tag)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(|m| IdTag {
                id_tag: m.id_tag,
                is_active: m.is_active,
                expiry_date: m.expiry_date,
                parent_id_tag: m.parent_id_tag,
            }))
    }

    async fn save(&self, tag: IdTag) -> DomainResult<()> {
        id_tag::ActiveModel {
            id_tag: Set(tag.id_tag),
            is_active: Set(tag.is_active),
            expiry_date: Set(tag.expiry_date),
            parent_id_tag: Set(tag.parent_id_tag),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn count(&self) -> DomainResult<u64> {
        id_tag::Entity::find().count(&self.db).await.map_err(db_err)
    }
}
