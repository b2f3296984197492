//! Session-close billing hook
//!
//! The only billing behavior in the core: when a session completes,
//! snapshot the tariff active for the site and write one Order row.
//! Settlement, invoicing and payment live outside this system.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{ChargingSession, DomainResult, Order, RepositoryProvider};

pub struct BillingService {
    repos: Arc<dyn RepositoryProvider>,
}

impl BillingService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Create the Order for a completed session, exactly once.
    ///
    /// Returns `None` when the session has no meter_stop yet or an
    /// Order already exists (idempotent against charger retries).
    pub async fn create_order_for_session(
        &self,
        session: &ChargingSession,
    ) -> DomainResult<Option<Order>> {
        let Some(energy_wh) = session.energy_wh() else {
            return Ok(None);
        };

        if self
            .repos
            .orders()
            .find_by_transaction_id(session.transaction_id)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let site_id = self
            .repos
            .charge_points()
            .find_by_id(&session.charge_point_id)
            .await?
            .and_then(|cp| cp.site_id);

        let closed_at = session.end_time.unwrap_or_else(Utc::now);
        let tariff = self
            .repos
            .tariffs()
            .active_for_site(site_id.as_deref(), closed_at)
            .await?;

        let (price_per_kwh, currency, tariff_id) = match &tariff {
            Some(t) => (t.base_price_per_kwh, t.currency.clone(), Some(t.id)),
            None => {
                warn!(
                    charge_point_id = session.charge_point_id.as_str(),
                    transaction_id = session.transaction_id,
                    "No active tariff at session close, order priced at zero"
                );
                (0.0, "USD".to_string(), None)
            }
        };

        let energy_kwh = energy_wh as f64 / 1000.0;
        let order = Order {
            id: format!(
                "order_{}_{}",
                session.charge_point_id, session.transaction_id
            ),
            transaction_id: session.transaction_id,
            charge_point_id: session.charge_point_id.clone(),
            energy_kwh,
            price_per_kwh,
            amount: energy_kwh * price_per_kwh,
            currency,
            tariff_id,
            created_at: Utc::now(),
        };

        self.repos.orders().create(order.clone()).await?;

        info!(
            charge_point_id = session.charge_point_id.as_str(),
            transaction_id = session.transaction_id,
            energy_kwh,
            amount = order.amount,
            "Order created for completed session"
        );

        Ok(Some(order))
    }
}
