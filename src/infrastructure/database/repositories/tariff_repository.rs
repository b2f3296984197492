//! SeaORM implementations of TariffRepository and OrderRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{DomainError, DomainResult, Order, OrderRepository, Tariff, TariffRepository};
use crate::infrastructure::database::entities::{order, tariff};

use super::db_err;

pub struct SeaOrmTariffRepository {
    db: DatabaseConnection,
}

impl SeaOrmTariffRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn tariff_to_domain(m: tariff::Model) -> Tariff {
    Tariff {
        id: m.id,
        site_id: m.site_id,
        name: m.name,
        base_price_per_kwh: m.base_price_per_kwh,
        currency: m.currency,
        valid_from: m.valid_from,
        valid_until: m.valid_until,
        is_active: m.is_active,
    }
}

#[async_trait]
impl TariffRepository for SeaOrmTariffRepository {
    async fn save(&self, t: Tariff) -> DomainResult<Tariff> {
        let inserted = tariff::ActiveModel {
            site_id: Set(t.site_id),
            name: Set(t.name),
            base_price_per_kwh: Set(t.base_price_per_kwh),
            currency: Set(t.currency),
            valid_from: Set(t.valid_from),
            valid_until: Set(t.valid_until),
            is_active: Set(t.is_active),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(tariff_to_domain(inserted))
    }

    async fn active_for_site(
        &self,
        site_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Tariff>> {
        let in_window = Condition::all()
            .add(tariff::Column::IsActive.eq(true))
            .add(tariff::Column::ValidFrom.lte(at))
            .add(
                Condition::any()
                    .add(tariff::Column::ValidUntil.is_null())
                    .add(tariff::Column::ValidUntil.gt(at)),
            );

        if let Some(site_id) = site_id {
            let for_site = tariff::Entity::find()
                .filter(in_window.clone())
                .filter(tariff::Column::SiteId.eq(site_id))
                .order_by_desc(tariff::Column::ValidFrom)
                .one(&self.db)
                .await
                .map_err(db_err)?;
            if let Some(t) = for_site {
                return Ok(Some(tariff_to_domain(t)));
            }
        }

        // Fall back to the installation-wide tariff
        Ok(tariff::Entity::find()
            .filter(in_window)
            .filter(tariff::Column::SiteId.is_null())
            .order_by_desc(tariff::Column::ValidFrom)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(tariff_to_domain))
    }
}

pub struct SeaOrmOrderRepository {
    db: DatabaseConnection,
}

impl SeaOrmOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn order_to_domain(m: order::Model) -> Order {
    Order {
        id: m.id,
        transaction_id: m.transaction_id,
        charge_point_id: m.charge_point_id,
        energy_kwh: m.energy_kwh,
        price_per_kwh: m.price_per_kwh,
        amount: m.amount,
        currency: m.currency,
        tariff_id: m.tariff_id,
        created_at: m.created_at,
    }
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn create(&self, o: Order) -> DomainResult<()> {
        // One order per session; a duplicate is a Conflict, same as
        // the in-memory provider.
        if order::Entity::find()
            .filter(order::Column::TransactionId.eq(o.transaction_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "order for transaction {} already exists",
                o.transaction_id
            )));
        }

        order::ActiveModel {
            id: Set(o.id),
            transaction_id: Set(o.transaction_id),
            charge_point_id: Set(o.charge_point_id),
            energy_kwh: Set(o.energy_kwh),
            price_per_kwh: Set(o.price_per_kwh),
            amount: Set(o.amount),
            currency: Set(o.currency),
            tariff_id: Set(o.tariff_id),
            created_at: Set(o.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_transaction_id(&self, transaction_id: i32) -> DomainResult<Option<Order>> {
        Ok(order::Entity::find()
            .filter(order::Column::TransactionId.eq(transaction_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(order_to_domain))
    }
}
