//! StatusNotification handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use rust_ocpp::v1_6::types::{ChargePointErrorCode, ChargePointStatus};
use serde_json::Value;
use tracing::info;

use crate::domain::EvseState;

use super::{parse_payload, wire_string, OcppCallError, OcppHandler};

pub async fn handle_status_notification(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, OcppCallError> {
    let req: StatusNotificationRequest = parse_payload(payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        connector_id = req.connector_id,
        status = ?req.status,
        error_code = ?req.error_code,
        "StatusNotification"
    );

    let status = match req.status {
        ChargePointStatus::Available => EvseState::Available,
        ChargePointStatus::Preparing => EvseState::Preparing,
        ChargePointStatus::Charging => EvseState::Charging,
        ChargePointStatus::SuspendedEV => EvseState::SuspendedEV,
        ChargePointStatus::SuspendedEVSE => EvseState::SuspendedEVSE,
        ChargePointStatus::Finishing => EvseState::Finishing,
        ChargePointStatus::Reserved => EvseState::Reserved,
        ChargePointStatus::Unavailable => EvseState::Unavailable,
        ChargePointStatus::Faulted => EvseState::Faulted,
    };

    let error_code = if matches!(req.error_code, ChargePointErrorCode::NoError) {
        None
    } else {
        wire_string(&req.error_code)
    };

    handler
        .service
        .update_evse_status(
            &handler.charge_point_id,
            req.connector_id as i32,
            status,
            error_code,
            req.timestamp.unwrap_or_else(Utc::now),
        )
        .await?;

    Ok(serde_json::to_value(&StatusNotificationResponse {}).unwrap_or_default())
}
