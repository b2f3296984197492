//! MeterValues handler

use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use serde_json::Value;
use tracing::info;

use super::{parse_payload, samples_from_meter_values, OcppCallError, OcppHandler};

pub async fn handle_meter_values(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, OcppCallError> {
    let req: MeterValuesRequest = parse_payload(payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        connector_id = req.connector_id,
        transaction_id = ?req.transaction_id,
        groups = req.meter_value.len(),
        "MeterValues"
    );

    let samples = samples_from_meter_values(&req.meter_value);
    handler
        .service
        .record_meter_values(
            &handler.charge_point_id,
            req.connector_id as i32,
            req.transaction_id,
            samples,
        )
        .await?;

    Ok(serde_json::to_value(&MeterValuesResponse {}).unwrap_or_default())
}
