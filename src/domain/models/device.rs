//! Device, device event and authorization-token domain entities

use chrono::{DateTime, Utc};

/// The credentialed physical unit behind a charge point.
///
/// Given the plaintext type-wide master secret and the serial number,
/// the device's MQTT password is deterministically re-derivable.
#[derive(Debug, Clone)]
pub struct Device {
    /// Serial number (primary key).
    pub serial_number: String,
    /// Vendor family identifier, e.g. `"zcf"`.
    pub type_code: String,
    /// Canonically `"{type_code}&{serial_number}"`.
    pub mqtt_client_id: String,
    /// Equals the serial number.
    pub mqtt_username: String,
    /// Sealed ciphertext of the per-type master secret (base64).
    pub master_secret_enc: String,
    /// Cipher used for the sealed secret, e.g. `"AES-256-GCM"`.
    pub encryption_algorithm: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn client_id_for(type_code: &str, serial_number: &str) -> String {
        format!("{}&{}", type_code, serial_number)
    }
}

/// Append-only audit log event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEventType {
    Boot,
    Heartbeat,
    StatusChange,
    TransactionStart,
    TransactionStop,
    Error,
}

impl DeviceEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Heartbeat => "heartbeat",
            Self::StatusChange => "status_change",
            Self::TransactionStart => "transaction_start",
            Self::TransactionStop => "transaction_stop",
            Self::Error => "error",
        }
    }
}

/// One row of the append-only device audit log.
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub id: i64,
    pub charge_point_id: String,
    pub device_serial_number: Option<String>,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    /// JSON blob with event-specific detail.
    pub details: Option<String>,
}

/// An authorization token (idTag) known to the installation.
///
/// An empty token store means accept-all; a populated store is
/// authoritative.
#[derive(Debug, Clone)]
pub struct IdTag {
    pub id_tag: String,
    pub is_active: bool,
    pub expiry_date: Option<DateTime<Utc>>,
    pub parent_id_tag: Option<String>,
}

impl IdTag {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expiry_date.map_or(true, |exp| exp > now)
    }
}
