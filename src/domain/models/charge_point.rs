//! ChargePoint, EVSE and EVSE status domain entities

use chrono::{DateTime, Utc};

/// EVSE id of the synthetic whole-station status row.
///
/// OCPP StatusNotification with `connectorId = 0` refers to the
/// station itself rather than any socket.
pub const STATION_EVSE_ID: i32 = 0;

/// Registration state of a charge point with the central system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unknown,
    Accepted,
    Pending,
    Rejected,
}

impl RegistrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Accepted => "Accepted",
            Self::Pending => "Pending",
            Self::Rejected => "Rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Accepted" => Self::Accepted,
            "Pending" => Self::Pending,
            "Rejected" => Self::Rejected,
            _ => Self::Unknown,
        }
    }
}

/// One physical charging station.
#[derive(Debug, Clone)]
pub struct ChargePoint {
    pub id: String,
    pub site_id: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    /// Link to the credentialed Device, if provisioned.
    pub device_serial_number: Option<String>,
    pub registration: RegistrationState,
    pub last_seen: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChargePoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            site_id: None,
            vendor: None,
            model: None,
            serial_number: None,
            firmware_version: None,
            device_serial_number: None,
            registration: RegistrationState::Unknown,
            last_seen: None,
            registered_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Some(Utc::now());
        self.updated_at = Some(Utc::now());
    }
}

/// One socket/connector on a charge point.
///
/// `(charge_point_id, evse_id)` is unique; `evse_id` is 1-based.
#[derive(Debug, Clone)]
pub struct Evse {
    pub id: i32,
    pub charge_point_id: String,
    pub evse_id: i32,
    pub connector_type: Option<String>,
    pub max_power_kw: Option<f64>,
}

/// Liveness/availability of an EVSE (OCPP 1.6 status vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvseState {
    Unknown,
    Available,
    Preparing,
    Charging,
    SuspendedEV,
    SuspendedEVSE,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
}

impl EvseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Available => "Available",
            Self::Preparing => "Preparing",
            Self::Charging => "Charging",
            Self::SuspendedEV => "SuspendedEV",
            Self::SuspendedEVSE => "SuspendedEVSE",
            Self::Finishing => "Finishing",
            Self::Reserved => "Reserved",
            Self::Unavailable => "Unavailable",
            Self::Faulted => "Faulted",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Available" => Self::Available,
            "Preparing" => Self::Preparing,
            "Charging" => Self::Charging,
            "SuspendedEV" => Self::SuspendedEV,
            "SuspendedEVSE" => Self::SuspendedEVSE,
            "Finishing" => Self::Finishing,
            "Reserved" => Self::Reserved,
            "Unavailable" => Self::Unavailable,
            "Faulted" => Self::Faulted,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for EvseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status row of an EVSE (exactly one per EVSE, plus the
/// synthetic station row at `evse_id = 0`).
///
/// Transitions are last-writer-wins by `last_seen`: an update carrying
/// an older timestamp than the stored row is ignored.
#[derive(Debug, Clone)]
pub struct EvseStatus {
    pub charge_point_id: String,
    pub evse_id: i32,
    pub status: EvseState,
    pub error_code: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl EvseStatus {
    pub fn new(charge_point_id: impl Into<String>, evse_id: i32, status: EvseState) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            evse_id,
            status,
            error_code: None,
            last_seen: Utc::now(),
        }
    }
}
