//! StopTransaction handler

use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::{info, warn};

use super::{parse_payload, samples_from_meter_values, OcppCallError, OcppHandler};

pub async fn handle_stop_transaction(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, OcppCallError> {
    let req: StopTransactionRequest = parse_payload(payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        transaction_id = req.transaction_id,
        meter_stop = req.meter_stop,
        "StopTransaction"
    );

    let samples = req
        .transaction_data
        .as_deref()
        .map(samples_from_meter_values)
        .unwrap_or_default();

    let outcome = handler
        .service
        .stop_transaction(
            req.transaction_id,
            req.meter_stop,
            req.timestamp,
            req.reason.as_ref().map(|r| format!("{:?}", r)),
            samples,
        )
        .await?;

    if outcome.already_completed {
        info!(
            charge_point_id = handler.charge_point_id.as_str(),
            transaction_id = req.transaction_id,
            "StopTransaction retry for completed transaction, no-op"
        );
    } else if let Err(e) = handler
        .billing
        .create_order_for_session(&outcome.session)
        .await
    {
        // The transaction is closed either way; order creation is
        // retried when the charger resends StopTransaction.
        warn!(
            charge_point_id = handler.charge_point_id.as_str(),
            transaction_id = req.transaction_id,
            error = %e,
            "Failed to create order for completed session"
        );
    }

    let response = StopTransactionResponse {
        id_tag_info: Some(IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        }),
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
