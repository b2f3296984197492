//! Operator OCPP command DTOs
//!
//! Request bodies are camelCase on the wire, matching the OCPP
//! payloads they turn into.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStartRequest {
    #[validate(length(min = 1))]
    pub charge_point_id: String,
    #[validate(length(min = 1, max = 20))]
    pub id_tag: String,
    pub connector_id: Option<u32>,
    /// Override for the default 5 s reply timeout.
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStopRequest {
    #[validate(length(min = 1))]
    pub charge_point_id: String,
    pub transaction_id: i32,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeConfigurationRequest {
    #[validate(length(min = 1))]
    pub charge_point_id: String,
    #[validate(length(min = 1, max = 50))]
    pub key: String,
    #[validate(length(max = 500))]
    pub value: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetConfigurationRequest {
    #[validate(length(min = 1))]
    pub charge_point_id: String,
    pub keys: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    #[validate(length(min = 1))]
    pub charge_point_id: String,
    /// "Hard" or "Soft"
    #[serde(rename = "type")]
    pub reset_type: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnlockConnectorRequest {
    #[validate(length(min = 1))]
    pub charge_point_id: String,
    pub connector_id: u32,
    pub timeout_seconds: Option<u64>,
}

/// Outcome of a dispatched command.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommandResult {
    /// Charger-reported status (e.g. "Accepted", "Rejected").
    pub status: String,
    /// Transport that carried the exchange.
    pub transport: String,
}
