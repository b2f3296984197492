//! MQTT transport adapter
//!
//! Topic scheme: chargers publish on `{typeCode}/{serial}/user/up`,
//! the CSMS answers on `{typeCode}/{serial}/user/down`. The CSMS
//! subscribes to the single wildcard `+/+/user/up` with QoS 1; device
//! credentials are verified by the broker against the credential
//! engine's auth callback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::application::session::TransportType;
use crate::support::ocpp_frame::OcppFrame;
use crate::support::shutdown::ShutdownSignal;

use super::{TransportAdapter, TransportContext, TransportError};

const UP_TOPIC_WILDCARD: &str = "+/+/user/up";

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1883,
            client_id: "eslatin-csms".to_string(),
        }
    }
}

pub struct MqttTransport {
    ctx: TransportContext,
    settings: MqttSettings,
    client: Mutex<Option<AsyncClient>>,
    /// serial → typeCode, learned from up-topic traffic.
    topics: Arc<DashMap<String, String>>,
    shutdown: ShutdownSignal,
}

impl MqttTransport {
    pub fn new(ctx: TransportContext, settings: MqttSettings, shutdown: ShutdownSignal) -> Self {
        Self {
            ctx,
            settings,
            client: Mutex::new(None),
            topics: Arc::new(DashMap::new()),
            shutdown,
        }
    }

    fn down_topic(type_code: &str, serial: &str) -> String {
        format!("{}/{}/user/down", type_code, serial)
    }

    /// Split `{typeCode}/{serial}/user/up` into its identifiers.
    fn parse_up_topic(topic: &str) -> Option<(&str, &str)> {
        let mut parts = topic.split('/');
        let type_code = parts.next()?;
        let serial = parts.next()?;
        if parts.next()? != "user" || parts.next()? != "up" || parts.next().is_some() {
            return None;
        }
        if type_code.is_empty() || serial.is_empty() {
            return None;
        }
        Some((type_code, serial))
    }
}

#[async_trait]
impl TransportAdapter for MqttTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Mqtt
    }

    async fn start(&self) -> Result<(), TransportError> {
        let mut options = MqttOptions::new(
            self.settings.client_id.clone(),
            self.settings.broker_host.clone(),
            self.settings.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut event_loop) = AsyncClient::new(options, 64);

        client
            .subscribe(UP_TOPIC_WILDCARD, QoS::AtLeastOnce)
            .await
            .map_err(|e| TransportError::SendFailed(format!("MQTT subscribe: {}", e)))?;

        *self.client.lock().await = Some(client.clone());

        info!(
            broker = format!("{}:{}", self.settings.broker_host, self.settings.broker_port),
            topic = UP_TOPIC_WILDCARD,
            "MQTT transport subscribed"
        );

        let ctx = self.ctx.clone();
        let topics = self.topics.clone();
        let shutdown = self.shutdown.clone();
        let publish_client = client.clone();

        tokio::spawn(async move {
            loop {
                if shutdown.is_triggered() {
                    return;
                }
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let Some((type_code, serial)) = Self::parse_up_topic(&publish.topic) else {
                            warn!(topic = publish.topic.as_str(), "Publish on unexpected topic");
                            continue;
                        };

                        let text = match std::str::from_utf8(&publish.payload) {
                            Ok(text) => text,
                            Err(_) => {
                                warn!(topic = publish.topic.as_str(), "Non-UTF-8 payload, dropping");
                                continue;
                            }
                        };

                        if !topics.contains_key(serial) {
                            topics.insert(serial.to_string(), type_code.to_string());
                            ctx.connections.register(serial, TransportType::Mqtt);
                        }

                        if let Some(reply) = ctx
                            .handle_incoming(serial, TransportType::Mqtt, text)
                            .await
                        {
                            let down = Self::down_topic(type_code, serial);
                            if let Err(e) = publish_client
                                .publish(down.as_str(), QoS::AtLeastOnce, false, reply.to_wire_text())
                                .await
                            {
                                error!(topic = down.as_str(), "MQTT publish failed: {}", e);
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // rumqttc reconnects on the next poll; back off
                        // so a dead broker does not spin the loop.
                        warn!("MQTT event loop error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(())
    }

    async fn stop(&self) {
        for entry in self.topics.iter() {
            self.ctx.pending.cancel_for_charger(entry.key());
            self.ctx.connections.unregister(entry.key(), TransportType::Mqtt);
        }
        self.topics.clear();

        if let Some(client) = self.client.lock().await.take() {
            let _ = client.disconnect().await;
        }
    }

    async fn send_message(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        let type_code = self
            .topics
            .get(charge_point_id)
            .map(|t| t.clone())
            .ok_or_else(|| TransportError::NotConnected(charge_point_id.to_string()))?;

        let client = self
            .client
            .lock()
            .await
            .clone()
            .ok_or_else(|| TransportError::SendFailed("MQTT transport not started".into()))?;

        let (unique_id, rx) = self.ctx.pending.register(charge_point_id, action);
        let frame = OcppFrame::Call {
            unique_id: unique_id.clone(),
            action: action.to_string(),
            payload,
        };

        let down = Self::down_topic(&type_code, charge_point_id);
        if let Err(e) = client
            .publish(down.as_str(), QoS::AtLeastOnce, false, frame.serialize())
            .await
        {
            self.ctx.pending.cancel(&unique_id);
            return Err(TransportError::SendFailed(format!("MQTT publish: {}", e)));
        }

        self.ctx.pending.await_response(&unique_id, rx, timeout).await
    }

    fn is_connected(&self, charge_point_id: &str) -> bool {
        self.topics.contains_key(charge_point_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_up_topic() {
        assert_eq!(
            MqttTransport::parse_up_topic("zcf/861076087029615/user/up"),
            Some(("zcf", "861076087029615"))
        );
        assert_eq!(MqttTransport::parse_up_topic("zcf/861/user/down"), None);
        assert_eq!(MqttTransport::parse_up_topic("zcf/user/up"), None);
        assert_eq!(MqttTransport::parse_up_topic("a/b/user/up/extra"), None);
    }

    #[test]
    fn down_topic_mirrors_identifiers() {
        assert_eq!(
            MqttTransport::down_topic("zcf", "861076087029615"),
            "zcf/861076087029615/user/down"
        );
    }
}
