//! Tariff and order domain entities
//!
//! Orders are derived financial records: the only billing behavior in
//! the core is the write-on-session-close hook that snapshots the
//! active tariff. Settlement lives elsewhere.

use chrono::{DateTime, Utc};

/// Pricing rule for a site, with a validity window.
#[derive(Debug, Clone)]
pub struct Tariff {
    pub id: i32,
    pub site_id: Option<String>,
    pub name: String,
    pub base_price_per_kwh: f64,
    pub currency: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Tariff {
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from <= at
            && self.valid_until.map_or(true, |until| until > at)
    }
}

/// Financial record created when a session closes.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub transaction_id: i32,
    pub charge_point_id: String,
    pub energy_kwh: f64,
    /// Price per kWh snapshotted from the tariff active at close time.
    pub price_per_kwh: f64,
    pub amount: f64,
    pub currency: String,
    pub tariff_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}
