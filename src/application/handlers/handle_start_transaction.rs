//! StartTransaction handler

use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::info;

use crate::support::ocpp_frame::OcppErrorCode;

use super::{parse_payload, OcppCallError, OcppHandler};

pub async fn handle_start_transaction(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, OcppCallError> {
    let req: StartTransactionRequest = parse_payload(payload)?;

    if req.connector_id < 1 {
        return Err(OcppCallError::new(
            OcppErrorCode::PropertyConstraintViolation,
            "connectorId must be >= 1 for StartTransaction",
        ));
    }

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        connector_id = req.connector_id,
        id_tag = req.id_tag.as_str(),
        meter_start = req.meter_start,
        "StartTransaction"
    );

    let accepted = handler.service.authorize(&req.id_tag).await?;
    if !accepted {
        let response = StartTransactionResponse {
            transaction_id: 0,
            id_tag_info: IdTagInfo {
                status: AuthorizationStatus::Invalid,
                expiry_date: None,
                parent_id_tag: None,
            },
        };
        return Ok(serde_json::to_value(&response).unwrap_or_default());
    }

    let outcome = handler
        .service
        .start_transaction(
            &handler.charge_point_id,
            req.connector_id as i32,
            &req.id_tag,
            req.meter_start,
            req.timestamp,
        )
        .await?;

    if !outcome.created {
        info!(
            charge_point_id = handler.charge_point_id.as_str(),
            transaction_id = outcome.session.transaction_id,
            "Duplicate StartTransaction, returning existing transaction"
        );
    }

    let response = StartTransactionResponse {
        transaction_id: outcome.session.transaction_id,
        id_tag_info: IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        },
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
