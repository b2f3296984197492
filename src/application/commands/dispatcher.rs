//! Command dispatcher — the single entry point for REST handlers to
//! send CS→CP commands. Wraps the transport manager and records
//! per-action latency.

use std::sync::Arc;
use std::time::Duration;

use crate::application::session::TransportType;
use crate::interfaces::transport::SharedTransportManager;

use super::{
    change_configuration, get_configuration, remote_start_transaction, remote_stop_transaction,
    reset, unlock_connector, CommandError, ConfigurationResult, ResetKind,
};

/// Record command dispatch latency to Prometheus.
fn record_command_latency(action: &'static str, start: std::time::Instant) {
    let duration = start.elapsed().as_secs_f64();
    metrics::histogram!("ocpp_command_latency_seconds", "action" => action).record(duration);
    metrics::counter!("ocpp_commands_total", "action" => action).increment(1);
}

pub struct CommandDispatcher {
    manager: SharedTransportManager,
}

pub type SharedCommandDispatcher = Arc<CommandDispatcher>;

pub fn create_command_dispatcher(manager: SharedTransportManager) -> SharedCommandDispatcher {
    Arc::new(CommandDispatcher::new(manager))
}

impl CommandDispatcher {
    pub fn new(manager: SharedTransportManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &SharedTransportManager {
        &self.manager
    }

    pub fn is_connected(&self, charge_point_id: &str) -> bool {
        self.manager.is_connected(charge_point_id)
    }

    pub async fn remote_start(
        &self,
        charge_point_id: &str,
        id_tag: &str,
        connector_id: Option<u32>,
        timeout: Option<Duration>,
    ) -> Result<(String, TransportType), CommandError> {
        let start = std::time::Instant::now();
        let result =
            remote_start_transaction(&self.manager, charge_point_id, id_tag, connector_id, timeout)
                .await;
        record_command_latency("remote_start", start);
        result
    }

    pub async fn remote_stop(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
        timeout: Option<Duration>,
    ) -> Result<(String, TransportType), CommandError> {
        let start = std::time::Instant::now();
        let result =
            remote_stop_transaction(&self.manager, charge_point_id, transaction_id, timeout).await;
        record_command_latency("remote_stop", start);
        result
    }

    pub async fn change_configuration(
        &self,
        charge_point_id: &str,
        key: &str,
        value: &str,
        timeout: Option<Duration>,
    ) -> Result<(String, TransportType), CommandError> {
        let start = std::time::Instant::now();
        let result =
            change_configuration(&self.manager, charge_point_id, key, value, timeout).await;
        record_command_latency("change_configuration", start);
        result
    }

    pub async fn get_configuration(
        &self,
        charge_point_id: &str,
        keys: Option<Vec<String>>,
        timeout: Option<Duration>,
    ) -> Result<(ConfigurationResult, TransportType), CommandError> {
        let start = std::time::Instant::now();
        let result = get_configuration(&self.manager, charge_point_id, keys, timeout).await;
        record_command_latency("get_configuration", start);
        result
    }

    pub async fn reset(
        &self,
        charge_point_id: &str,
        reset_type: ResetKind,
        timeout: Option<Duration>,
    ) -> Result<(String, TransportType), CommandError> {
        let start = std::time::Instant::now();
        let result = reset(&self.manager, charge_point_id, reset_type, timeout).await;
        record_command_latency("reset", start);
        result
    }

    pub async fn unlock_connector(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        timeout: Option<Duration>,
    ) -> Result<(String, TransportType), CommandError> {
        let start = std::time::Instant::now();
        let result = unlock_connector(&self.manager, charge_point_id, connector_id, timeout).await;
        record_command_latency("unlock_connector", start);
        result
    }
}
