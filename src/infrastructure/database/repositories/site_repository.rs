//! SeaORM implementation of SiteRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::domain::{DomainResult, Site, SiteRepository};
use crate::infrastructure::database::entities::site;

use super::db_err;

pub struct SeaOrmSiteRepository {
    db: DatabaseConnection,
}

impl SeaOrmSiteRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn site_to_domain(m: site::Model) -> Site {
    Site {
        id: m.id,
        name: m.name,
        address: m.address,
        latitude: m.latitude,
        longitude: m.longitude,
        is_active: m.is_active,
        created_at: m.created_at,
    }
}

#[async_trait]
impl SiteRepository for SeaOrmSiteRepository {
    async fn save(&self, s: Site) -> DomainResult<()> {
        site::ActiveModel {
            id: Set(s.id),
            name: Set(s.name),
            address: Set(s.address),
            latitude: Set(s.latitude),
            longitude: Set(s.longitude),
            is_active: Set(s.is_active),
            created_at: Set(s.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Site>> {
        Ok(site::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(site_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<Site>> {
        Ok(site::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(site_to_domain)
            .collect())
    }
}
