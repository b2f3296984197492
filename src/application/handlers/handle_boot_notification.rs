//! BootNotification handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::info;

use super::{parse_payload, OcppCallError, OcppHandler};

pub async fn handle_boot_notification(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, OcppCallError> {
    let req: BootNotificationRequest = parse_payload(payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        vendor = req.charge_point_vendor.as_str(),
        model = req.charge_point_model.as_str(),
        "BootNotification"
    );

    handler
        .service
        .register_or_update(
            &handler.charge_point_id,
            &req.charge_point_vendor,
            &req.charge_point_model,
            req.charge_point_serial_number.as_deref(),
            req.firmware_version.as_deref(),
        )
        .await?;

    let response = BootNotificationResponse {
        current_time: Utc::now(),
        interval: handler.heartbeat_interval as _,
        status: RegistrationStatus::Accepted,
    };

    Ok(serde_json::to_value(&response).unwrap_or_default())
}
