//! Wire-format timestamps
//!
//! Every timestamp the CSMS puts on the wire is ISO 8601 UTC with a
//! trailing `Z` (e.g. `2024-06-01T12:34:56.789Z`). A `+00:00` suffix
//! is a wire-compat bug on some charger firmware.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC instant for an OCPP payload.
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time formatted for an OCPP payload.
pub fn utc_now_string() -> String {
    format_utc(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ends_with_z_never_offset() {
        let s = utc_now_string();
        assert!(s.ends_with('Z'), "timestamp must end with Z: {}", s);
        assert!(!s.contains("+00:00"));
    }

    #[test]
    fn millisecond_precision() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 1, 12, 34, 56).unwrap()
            + chrono::Duration::milliseconds(789);
        assert_eq!(format_utc(dt), "2024-06-01T12:34:56.789Z");
    }
}
