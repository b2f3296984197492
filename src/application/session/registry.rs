//! Connection registry — tracks which chargers are connected, on
//! which transports, and when they were last heard from.
//!
//! Adapters register a claim on connect and drop it on disconnect;
//! every inbound message touches the claim. The dispatcher and the
//! outbound sender read liveness from here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};

/// The three concrete transports a charger can speak over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    Mqtt,
    WebSocket,
    Http,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mqtt => "MQTT",
            Self::WebSocket => "WebSocket",
            Self::Http => "HTTP",
        }
    }

    /// Declared fallback priority for outbound routing.
    pub fn priority_order() -> [TransportType; 3] {
        [Self::Mqtt, Self::WebSocket, Self::Http]
    }
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transport's claim on a charger.
#[derive(Debug, Clone)]
pub struct ClaimInfo {
    pub transport: TransportType,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Thread-safe registry of charger connections across all transports.
pub struct ConnectionRegistry {
    claims: DashMap<(String, TransportType), ClaimInfo>,
}

/// Shared, reference-counted connection registry
pub type SharedConnectionRegistry = Arc<ConnectionRegistry>;

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            claims: DashMap::new(),
        }
    }

    pub fn shared() -> SharedConnectionRegistry {
        Arc::new(Self::new())
    }

    /// Register a transport's claim on a charger.
    pub fn register(&self, charge_point_id: &str, transport: TransportType) {
        let now = Utc::now();
        info!(charge_point_id, %transport, "Registering charger session");
        self.claims.insert(
            (charge_point_id.to_string(), transport),
            ClaimInfo {
                transport,
                connected_at: now,
                last_activity: now,
            },
        );
        metrics::gauge!("ocpp_connected_stations").set(self.connected_ids().len() as f64);
    }

    /// Drop a transport's claim on a charger.
    pub fn unregister(&self, charge_point_id: &str, transport: TransportType) {
        if self
            .claims
            .remove(&(charge_point_id.to_string(), transport))
            .is_some()
        {
            info!(charge_point_id, %transport, "Unregistered charger session");
        } else {
            warn!(charge_point_id, %transport, "Attempted to unregister unknown session");
        }
        metrics::gauge!("ocpp_connected_stations").set(self.connected_ids().len() as f64);
    }

    /// Update last activity for a charger on a transport.
    pub fn touch(&self, charge_point_id: &str, transport: TransportType) {
        if let Some(mut claim) = self
            .claims
            .get_mut(&(charge_point_id.to_string(), transport))
        {
            claim.last_activity = Utc::now();
        }
    }

    /// Whether any transport currently claims the charger.
    pub fn is_connected(&self, charge_point_id: &str) -> bool {
        self.claims.iter().any(|e| e.key().0 == charge_point_id)
    }

    pub fn is_connected_on(&self, charge_point_id: &str, transport: TransportType) -> bool {
        self.claims
            .contains_key(&(charge_point_id.to_string(), transport))
    }

    /// Transports currently claiming the charger.
    pub fn transports_for(&self, charge_point_id: &str) -> Vec<TransportType> {
        self.claims
            .iter()
            .filter(|e| e.key().0 == charge_point_id)
            .map(|e| e.value().transport)
            .collect()
    }

    /// The claim heard from most recently, i.e. the primary transport.
    pub fn primary_transport(&self, charge_point_id: &str) -> Option<TransportType> {
        self.claims
            .iter()
            .filter(|e| e.key().0 == charge_point_id)
            .max_by_key(|e| e.value().last_activity)
            .map(|e| e.value().transport)
    }

    /// Most recent activity instant across all of the charger's claims.
    pub fn last_seen(&self, charge_point_id: &str) -> Option<DateTime<Utc>> {
        self.claims
            .iter()
            .filter(|e| e.key().0 == charge_point_id)
            .map(|e| e.value().last_activity)
            .max()
    }

    /// All charger ids with at least one active claim.
    pub fn connected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.claims.iter().map(|e| e.key().0.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn count(&self) -> usize {
        self.connected_ids().len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_touch_unregister() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.is_connected("CP1"));

        registry.register("CP1", TransportType::WebSocket);
        assert!(registry.is_connected("CP1"));
        assert!(registry.is_connected_on("CP1", TransportType::WebSocket));
        assert!(!registry.is_connected_on("CP1", TransportType::Mqtt));

        registry.unregister("CP1", TransportType::WebSocket);
        assert!(!registry.is_connected("CP1"));
    }

    #[test]
    fn primary_transport_follows_activity() {
        let registry = ConnectionRegistry::new();
        registry.register("CP1", TransportType::Mqtt);
        registry.register("CP1", TransportType::WebSocket);

        registry.touch("CP1", TransportType::Mqtt);
        assert_eq!(registry.primary_transport("CP1"), Some(TransportType::Mqtt));

        registry.touch("CP1", TransportType::WebSocket);
        assert_eq!(
            registry.primary_transport("CP1"),
            Some(TransportType::WebSocket)
        );
    }

    #[test]
    fn connected_ids_dedupes_multi_transport_chargers() {
        let registry = ConnectionRegistry::new();
        registry.register("CP1", TransportType::Mqtt);
        registry.register("CP1", TransportType::Http);
        registry.register("CP2", TransportType::WebSocket);

        assert_eq!(registry.connected_ids(), vec!["CP1", "CP2"]);
        assert_eq!(registry.count(), 2);
    }
}
