//! OCPP-J message framing
//!
//! Implements the OCPP-J (JSON) transport framing shared by every
//! adapter. The canonical OCPP 1.6 frame is a 4-element array:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! On the incoming path only, the legacy dictionary form
//! `{"action": "...", "payload": {...}}` is also accepted; replies to
//! such messages are emitted in the matching dictionary shape
//! (`{"action": "...", "response": {...}}`). Outbound CSMS calls are
//! always standard 4-arrays.

use serde_json::{json, Value};
use thiserror::Error;

// ── Message-type constants ─────────────────────────────────────

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

// ── Wire format ────────────────────────────────────────────────

/// Which on-the-wire shape an incoming message used.
///
/// The reply must be framed in the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Standard OCPP-J 4-array frame.
    Standard,
    /// Legacy `{"action", "payload"}` dictionary.
    Simplified,
}

// ── OCPP error codes ───────────────────────────────────────────

/// OCPP 1.6 CallError codes, propagated verbatim across transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcppErrorCode {
    /// Payload is syntactically incorrect.
    FormationViolation,
    /// A field has the wrong type.
    TypeConstraintViolation,
    /// A field value violates a constraint.
    PropertyConstraintViolation,
    /// A required field is missing.
    OccurrenceConstraintViolation,
    /// Frame violates the OCPP-J framing rules.
    ProtocolError,
    /// Action is recognized but not supported.
    NotSupported,
    /// Action is not implemented.
    NotImplemented,
    /// Handler failed internally.
    InternalError,
}

impl OcppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormationViolation => "FormationViolation",
            Self::TypeConstraintViolation => "TypeConstraintViolation",
            Self::PropertyConstraintViolation => "PropertyConstraintViolation",
            Self::OccurrenceConstraintViolation => "OccurrenceConstraintViolation",
            Self::ProtocolError => "ProtocolError",
            Self::NotSupported => "NotSupported",
            Self::NotImplemented => "NotImplemented",
            Self::InternalError => "InternalError",
        }
    }
}

impl std::fmt::Display for OcppErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Unique IDs ─────────────────────────────────────────────────

/// Generate a UniqueId for an outbound CSMS call: `"csms_"` followed
/// by 16 hex characters of random entropy.
pub fn generate_unique_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("csms_{}", &hex[..16])
}

// ── OcppFrame ──────────────────────────────────────────────────

/// A parsed OCPP-J frame (transport envelope).
#[derive(Debug, Clone)]
pub enum OcppFrame {
    /// `[2, uniqueId, action, payload]`
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    /// `[3, uniqueId, payload]`
    CallResult {
        unique_id: String,
        payload: Value,
    },
    /// `[4, uniqueId, errorCode, errorDescription, errorDetails]`
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

impl OcppFrame {
    // ── Parsing ────────────────────────────────────────────

    /// Parse raw JSON text into a frame, accepting both the standard
    /// 4-array and the legacy simplified dictionary.
    pub fn parse_incoming(text: &str) -> Result<(Self, WireFormat), OcppFrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| OcppFrameError::InvalidJson(e.to_string()))?;

        match value {
            Value::Array(arr) => Self::parse_array(&arr).map(|f| (f, WireFormat::Standard)),
            Value::Object(obj) => {
                let action = obj
                    .get("action")
                    .and_then(Value::as_str)
                    .ok_or(OcppFrameError::MissingAction)?
                    .to_string();
                let payload = obj.get("payload").cloned().unwrap_or_else(|| json!({}));
                // Legacy dicts carry no UniqueId; synthesize one so the
                // dispatcher path stays uniform. It is never echoed.
                Ok((
                    Self::Call {
                        unique_id: generate_unique_id(),
                        action,
                        payload,
                    },
                    WireFormat::Simplified,
                ))
            }
            other => Err(OcppFrameError::UnexpectedShape(format!(
                "expected array or object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Parse a standard 4-array frame only.
    pub fn parse(text: &str) -> Result<Self, OcppFrameError> {
        let arr: Vec<Value> =
            serde_json::from_str(text).map_err(|e| OcppFrameError::InvalidJson(e.to_string()))?;
        Self::parse_array(&arr)
    }

    fn parse_array(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.is_empty() {
            return Err(OcppFrameError::EmptyArray);
        }

        let msg_type = arr[0].as_u64().ok_or(OcppFrameError::InvalidMessageType)?;

        match msg_type {
            MSG_TYPE_CALL => Self::parse_call(arr),
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(arr),
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(arr),
            _ => Err(OcppFrameError::UnknownMessageType(msg_type)),
        }
    }

    fn parse_call(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 4 {
            return Err(OcppFrameError::MissingFields {
                expected: 4,
                got: arr.len(),
            });
        }

        let unique_id = arr[1]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("uniqueId must be a string"))?
            .to_string();
        let action = arr[2]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("action must be a string"))?
            .to_string();
        let payload = arr[3].clone();

        Ok(Self::Call {
            unique_id,
            action,
            payload,
        })
    }

    fn parse_call_result(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 2 {
            return Err(OcppFrameError::MissingFields {
                expected: 3,
                got: arr.len(),
            });
        }

        let unique_id = arr[1]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("uniqueId must be a string"))?
            .to_string();
        // Some stations send [3, "id"] or a null payload; normalize to {}
        let payload = match arr.get(2) {
            Some(Value::Null) | None => json!({}),
            Some(v) => v.clone(),
        };

        Ok(Self::CallResult { unique_id, payload })
    }

    fn parse_call_error(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 2 {
            return Err(OcppFrameError::MissingFields {
                expected: 4,
                got: arr.len(),
            });
        }

        let unique_id = arr[1]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("uniqueId must be a string"))?
            .to_string();
        // Tolerate truncated CallError frames like [4,"id"] or [4,"id","Code"]
        let error_code = arr
            .get(2)
            .and_then(|v| v.as_str())
            .unwrap_or("InternalError")
            .to_string();
        let error_description = arr
            .get(3)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let error_details = arr.get(4).cloned().unwrap_or_else(|| json!({}));

        Ok(Self::CallError {
            unique_id,
            error_code,
            error_description,
            error_details,
        })
    }

    // ── Serialization ──────────────────────────────────────

    /// Serialize this frame to its standard 4-array JSON string.
    pub fn serialize(&self) -> String {
        // serde_json::to_string on a Value never fails
        serde_json::to_string(&self.to_value()).unwrap()
    }

    /// The standard 4-array representation as a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL.into()),
                Value::String(unique_id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ]),

            Self::CallResult { unique_id, payload } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_RESULT.into()),
                Value::String(unique_id.clone()),
                payload.clone(),
            ]),

            Self::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_ERROR.into()),
                Value::String(unique_id.clone()),
                Value::String(error_code.clone()),
                Value::String(error_description.clone()),
                error_details.clone(),
            ]),
        }
    }

    /// Serialize a reply to a legacy simplified message:
    /// `{"action": "...", "response": {...}}`.
    pub fn serialize_simplified(&self, action: &str) -> String {
        // serde_json::to_string on a Value never fails
        serde_json::to_string(&self.simplified_value(action)).unwrap()
    }

    /// The legacy dictionary representation of this frame.
    pub fn simplified_value(&self, action: &str) -> Value {
        match self {
            Self::CallResult { payload, .. } => json!({
                "action": action,
                "response": payload,
            }),
            Self::CallError {
                error_code,
                error_description,
                ..
            } => json!({
                "action": action,
                "response": {
                    "errorCode": error_code,
                    "errorDescription": error_description,
                },
            }),
            Self::Call {
                action: call_action,
                payload,
                ..
            } => json!({
                "action": call_action,
                "payload": payload,
            }),
        }
    }

    // ── Helpers ────────────────────────────────────────────

    /// Get the unique message ID.
    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call { unique_id, .. }
            | Self::CallResult { unique_id, .. }
            | Self::CallError { unique_id, .. } => unique_id,
        }
    }

    /// Create a `CallResult` reply for a given unique ID.
    pub fn result(unique_id: impl Into<String>, payload: Value) -> Self {
        Self::CallResult {
            unique_id: unique_id.into(),
            payload,
        }
    }

    /// Create a `CallError` reply for a given unique ID.
    pub fn error(
        unique_id: impl Into<String>,
        code: OcppErrorCode,
        description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            unique_id: unique_id.into(),
            error_code: code.as_str().to_string(),
            error_description: description.into(),
            error_details: json!({}),
        }
    }

    /// Returns `true` if this is a `Call` frame.
    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Errors ─────────────────────────────────────────────────────

/// Errors that can occur when parsing an OCPP-J frame.
#[derive(Debug, Error)]
pub enum OcppFrameError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Empty OCPP message array")]
    EmptyArray,
    #[error("Message type is not a number")]
    InvalidMessageType,
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),
    #[error("Expected at least {expected} fields, got {got}")]
    MissingFields { expected: usize, got: usize },
    #[error("Field type mismatch: {0}")]
    FieldTypeMismatch(&'static str),
    #[error("Simplified message has no action field")]
    MissingAction,
    #[error("Unexpected message shape: {0}")]
    UnexpectedShape(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_call() {
        let text = r#"[2,"abc1","BootNotification",{"chargePointVendor":"ZCF","chargePointModel":"F1Pro"}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => {
                assert_eq!(unique_id, "abc1");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "ZCF");
            }
            _ => panic!("Expected Call frame"),
        }
    }

    #[test]
    fn parse_call_result() {
        let text = r#"[3,"abc1",{"status":"Accepted","interval":60}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::CallResult { unique_id, payload } => {
                assert_eq!(unique_id, "abc1");
                assert_eq!(payload["status"], "Accepted");
            }
            _ => panic!("Expected CallResult frame"),
        }
    }

    #[test]
    fn parse_truncated_call_error() {
        let frame = OcppFrame::parse(r#"[4,"x9"]"#).unwrap();
        match frame {
            OcppFrame::CallError {
                unique_id,
                error_code,
                ..
            } => {
                assert_eq!(unique_id, "x9");
                assert_eq!(error_code, "InternalError");
            }
            _ => panic!("Expected CallError frame"),
        }
    }

    #[test]
    fn parse_simplified_dict() {
        let (frame, format) =
            OcppFrame::parse_incoming(r#"{"action":"Heartbeat","payload":{}}"#).unwrap();
        assert_eq!(format, WireFormat::Simplified);
        match frame {
            OcppFrame::Call { action, .. } => assert_eq!(action, "Heartbeat"),
            _ => panic!("Expected Call frame"),
        }
    }

    #[test]
    fn reject_simplified_without_action() {
        let err = OcppFrame::parse_incoming(r#"{"payload":{}}"#).unwrap_err();
        assert!(matches!(err, OcppFrameError::MissingAction));
    }

    #[test]
    fn roundtrip_preserves_structure() {
        let frame = OcppFrame::Call {
            unique_id: "id1".into(),
            action: "Heartbeat".into(),
            payload: json!({}),
        };
        let json = frame.serialize();
        let reparsed = OcppFrame::parse(&json).unwrap();
        assert!(reparsed.is_call());
        assert_eq!(reparsed.unique_id(), "id1");
        assert_eq!(reparsed.serialize(), json);
    }

    #[test]
    fn call_result_echoes_unique_id() {
        let reply = OcppFrame::result("abc1", json!({"currentTime": "2024-06-01T12:00:00Z"}));
        let text = reply.serialize();
        assert_eq!(OcppFrame::parse(&text).unwrap().unique_id(), "abc1");
    }

    #[test]
    fn error_frame_carries_code() {
        let reply = OcppFrame::error("e1", OcppErrorCode::NotSupported, "Unknown action");
        let text = reply.serialize();
        match OcppFrame::parse(&text).unwrap() {
            OcppFrame::CallError { error_code, .. } => assert_eq!(error_code, "NotSupported"),
            _ => panic!("Expected CallError frame"),
        }
    }

    #[test]
    fn unique_id_format() {
        let id = generate_unique_id();
        assert!(id.starts_with("csms_"));
        assert_eq!(id.len(), 5 + 16);
        assert!(id[5..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_unique_id());
    }

    #[test]
    fn simplified_reply_shape() {
        let reply = OcppFrame::result("ignored", json!({"currentTime": "2024-06-01T12:00:00Z"}));
        let text = reply.serialize_simplified("Heartbeat");
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["action"], "Heartbeat");
        assert_eq!(v["response"]["currentTime"], "2024-06-01T12:00:00Z");
    }
}
