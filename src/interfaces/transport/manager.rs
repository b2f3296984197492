//! Transport manager — routes outbound messages to the right adapter.
//!
//! Holds the registered adapters and, via the connection registry,
//! knows which transports currently claim each charger. Routing: the
//! preferred transport wins if connected, otherwise the declared
//! priority order (MQTT, WebSocket, HTTP) is tried; with no connected
//! transport the call fails `NotConnected`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::application::session::{SharedConnectionRegistry, TransportType};

use super::{SharedTransportAdapter, TransportError, DEFAULT_CALL_TIMEOUT};

pub struct TransportManager {
    adapters: Vec<SharedTransportAdapter>,
    connections: SharedConnectionRegistry,
}

pub type SharedTransportManager = Arc<TransportManager>;

impl TransportManager {
    pub fn new(connections: SharedConnectionRegistry) -> Self {
        Self {
            adapters: Vec::new(),
            connections,
        }
    }

    /// Register an adapter. Registration order does not affect
    /// routing; fallback always follows the declared priority.
    pub fn register(&mut self, adapter: SharedTransportAdapter) {
        info!(transport = %adapter.transport_type(), "Transport adapter registered");
        self.adapters.push(adapter);
    }

    pub fn adapter(&self, transport: TransportType) -> Option<&SharedTransportAdapter> {
        self.adapters
            .iter()
            .find(|a| a.transport_type() == transport)
    }

    pub fn adapters(&self) -> &[SharedTransportAdapter] {
        &self.adapters
    }

    pub fn connections(&self) -> &SharedConnectionRegistry {
        &self.connections
    }

    /// Whether any registered adapter has a live session for the
    /// charger.
    pub fn is_connected(&self, charge_point_id: &str) -> bool {
        self.adapters
            .iter()
            .any(|a| a.is_connected(charge_point_id))
    }

    /// Pick the adapter that will carry an outbound call.
    fn resolve(
        &self,
        charge_point_id: &str,
        preferred: Option<TransportType>,
    ) -> Result<&SharedTransportAdapter, TransportError> {
        if let Some(preferred) = preferred {
            if let Some(adapter) = self.adapter(preferred) {
                if adapter.is_connected(charge_point_id) {
                    return Ok(adapter);
                }
            }
        }

        for transport in TransportType::priority_order() {
            if Some(transport) == preferred {
                continue;
            }
            if let Some(adapter) = self.adapter(transport) {
                if adapter.is_connected(charge_point_id) {
                    return Ok(adapter);
                }
            }
        }

        Err(TransportError::NotConnected(charge_point_id.to_string()))
    }

    /// Send an OCPP CALL and await the reply.
    ///
    /// Returns the reply payload together with the transport that
    /// carried the exchange.
    pub async fn send_message(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
        preferred: Option<TransportType>,
        timeout: Option<Duration>,
    ) -> Result<(Value, TransportType), TransportError> {
        let adapter = self.resolve(charge_point_id, preferred)?;
        let transport = adapter.transport_type();
        let timeout = timeout.unwrap_or(DEFAULT_CALL_TIMEOUT);

        info!(charge_point_id, action, %transport, "Sending command");
        metrics::counter!("ocpp_messages_total", "direction" => "outbound", "transport" => transport.as_str())
            .increment(1);

        match adapter
            .send_message(charge_point_id, action, payload, timeout)
            .await
        {
            Ok(value) => Ok((value, transport)),
            Err(e) => {
                warn!(charge_point_id, action, %transport, error = %e, "Command failed");
                Err(e)
            }
        }
    }

    /// Stop every adapter, cancelling in-flight calls.
    pub async fn stop_all(&self) {
        for adapter in &self.adapters {
            adapter.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::ConnectionRegistry;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeAdapter {
        transport: TransportType,
        connected: bool,
    }

    #[async_trait]
    impl super::super::TransportAdapter for FakeAdapter {
        fn transport_type(&self) -> TransportType {
            self.transport
        }

        async fn start(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn stop(&self) {}

        async fn send_message(
            &self,
            _charge_point_id: &str,
            _action: &str,
            _payload: Value,
            _timeout: Duration,
        ) -> Result<Value, TransportError> {
            Ok(json!({"via": self.transport.as_str()}))
        }

        fn is_connected(&self, _charge_point_id: &str) -> bool {
            self.connected
        }
    }

    fn manager(mqtt_up: bool, ws_up: bool, http_up: bool) -> TransportManager {
        let mut manager = TransportManager::new(ConnectionRegistry::shared());
        manager.register(Arc::new(FakeAdapter {
            transport: TransportType::Mqtt,
            connected: mqtt_up,
        }));
        manager.register(Arc::new(FakeAdapter {
            transport: TransportType::WebSocket,
            connected: ws_up,
        }));
        manager.register(Arc::new(FakeAdapter {
            transport: TransportType::Http,
            connected: http_up,
        }));
        manager
    }

    #[tokio::test]
    async fn preferred_transport_wins_when_connected() {
        let manager = manager(true, true, true);
        let (reply, transport) = manager
            .send_message("CP1", "Reset", json!({}), Some(TransportType::WebSocket), None)
            .await
            .unwrap();
        assert_eq!(transport, TransportType::WebSocket);
        assert_eq!(reply["via"], "WebSocket");
    }

    #[tokio::test]
    async fn falls_back_in_declared_priority() {
        // MQTT offline, WebSocket online.
        let manager = manager(false, true, true);
        let (_, transport) = manager
            .send_message("CP1", "RemoteStartTransaction", json!({}), Some(TransportType::Mqtt), None)
            .await
            .unwrap();
        assert_eq!(transport, TransportType::WebSocket);
    }

    #[tokio::test]
    async fn http_is_last_resort() {
        let manager = manager(false, false, true);
        let (_, transport) = manager
            .send_message("CP1", "Reset", json!({}), None, None)
            .await
            .unwrap();
        assert_eq!(transport, TransportType::Http);
    }

    #[tokio::test]
    async fn not_connected_when_no_transport_claims() {
        let manager = manager(false, false, false);
        let err = manager
            .send_message("CP1", "Reset", json!({}), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected(_)));
    }
}
