//! Application configuration
//!
//! Defaults, then an optional TOML file, then environment overrides —
//! the environment always wins, so containerized deployments only set
//! variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub mqtt: MqttSection,
    pub transports: TransportSection,
    pub security: SecuritySection,
    pub ocpp: OcppSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub api_host: String,
    pub api_port: u16,
    pub ws_host: String,
    pub ws_port: u16,
    /// Seconds allowed for graceful shutdown.
    pub shutdown_timeout: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 9000,
            ws_host: "0.0.0.0".to_string(),
            ws_port: 9001,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./csms.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttSection {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1883,
            client_id: "eslatin-csms".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    pub mqtt: bool,
    pub websocket: bool,
    pub http: bool,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            mqtt: true,
            websocket: true,
            http: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    /// Process-wide secret the AES key is derived from.
    pub encryption_key: String,
    /// First 16 bytes feed the PBKDF2 salt.
    pub encryption_salt: String,
    /// Master secret for devices registered without an explicit one.
    pub default_master_secret: String,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            encryption_key: "change-me-in-production".to_string(),
            encryption_salt: "ocpp_csms_salt".to_string(),
            default_master_secret: "change-me-device-master-secret".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcppSection {
    /// Heartbeat cadence handed to chargers at boot, in seconds.
    pub heartbeat_interval: u32,
}

impl Default for OcppSection {
    fn default() -> Self {
        Self {
            heartbeat_interval: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            database: DatabaseSection::default(),
            mqtt: MqttSection::default(),
            transports: TransportSection::default(),
            security: SecuritySection::default(),
            ocpp: OcppSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("read {}: {}", path.display(), e))?;
        let mut config: AppConfig =
            toml::from_str(&text).map_err(|e| format!("parse {}: {}", path.display(), e))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides (no config file).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(key) = std::env::var("ENCRYPTION_KEY") {
            self.security.encryption_key = key;
        }
        if let Ok(salt) = std::env::var("ENCRYPTION_SALT") {
            self.security.encryption_salt = salt;
        }
        if let Ok(secret) = std::env::var("DEVICE_MASTER_SECRET") {
            self.security.default_master_secret = secret;
        }
        if let Ok(v) = std::env::var("ENABLE_MQTT_TRANSPORT") {
            self.transports.mqtt = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("ENABLE_WEBSOCKET_TRANSPORT") {
            self.transports.websocket = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("ENABLE_HTTP_TRANSPORT") {
            self.transports.http = parse_bool(&v);
        }
        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            self.mqtt.broker_host = host;
        }
        if let Ok(port) = std::env::var("MQTT_BROKER_PORT") {
            if let Ok(port) = port.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.api_host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            if let Ok(port) = port.parse() {
                self.server.api_port = port;
            }
        }
        if let Ok(host) = std::env::var("WS_HOST") {
            self.server.ws_host = host;
        }
        if let Ok(port) = std::env::var("WS_PORT") {
            if let Ok(port) = port.parse() {
                self.server.ws_port = port;
            }
        }
        if let Ok(interval) = std::env::var("HEARTBEAT_INTERVAL") {
            if let Ok(interval) = interval.parse() {
                self.ocpp.heartbeat_interval = interval;
            }
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Default config file location, e.g.
/// `~/.config/eslatin-csms/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eslatin-csms")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = AppConfig::default();
        assert_eq!(config.server.api_port, 9000);
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.ocpp.heartbeat_interval, 60);
        assert!(config.transports.mqtt && config.transports.websocket && config.transports.http);
    }

    #[test]
    fn parses_transport_flags() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("Yes"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("off"));
    }

    #[test]
    fn toml_sections_deserialize() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            api_port = 8080

            [transports]
            mqtt = false

            [ocpp]
            heartbeat_interval = 300
            "#,
        )
        .unwrap();
        assert_eq!(config.server.api_port, 8080);
        assert!(!config.transports.mqtt);
        assert!(config.transports.websocket);
        assert_eq!(config.ocpp.heartbeat_interval, 300);
    }
}
