//! Charging session and meter sample domain entities

use chrono::{DateTime, Utc};

/// Charging session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
    Aborted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Aborted => "Aborted",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Active" => Self::Active,
            "Completed" => Self::Completed,
            _ => Self::Aborted,
        }
    }
}

/// One ongoing or completed charging transaction.
///
/// Invariants: while `status == Active`, `end_time` and `meter_stop`
/// are `None`; at most one Active session per `(charge_point_id,
/// evse_id)`; on completion `meter_stop >= meter_start`.
#[derive(Debug, Clone)]
pub struct ChargingSession {
    /// Transaction id assigned by the CSMS, monotonically increasing
    /// per installation. Doubles as the primary key.
    pub transaction_id: i32,
    pub charge_point_id: String,
    pub evse_id: i32,
    pub id_tag: String,
    pub user_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Meter reading at start (Wh).
    pub meter_start: i32,
    /// Meter reading at stop (Wh).
    pub meter_stop: Option<i32>,
    pub status: SessionStatus,
    pub stop_reason: Option<String>,
}

impl ChargingSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Energy delivered over the session, in Wh.
    pub fn energy_wh(&self) -> Option<i32> {
        self.meter_stop.map(|stop| stop - self.meter_start)
    }
}

/// One periodic energy/power sample attached to a session.
/// Append-only.
#[derive(Debug, Clone)]
pub struct MeterValueSample {
    pub id: i64,
    pub transaction_id: i32,
    pub timestamp: DateTime<Utc>,
    pub measurand: String,
    /// Raw value string as sent on the wire.
    pub value: String,
    pub unit: Option<String>,
}
