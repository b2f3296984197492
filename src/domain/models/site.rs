//! Site domain entity

use chrono::{DateTime, Utc};

/// A logical location grouping charge points.
///
/// Deletion is forbidden while any ChargePoint references the site.
#[derive(Debug, Clone)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Site {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            latitude: None,
            longitude: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
