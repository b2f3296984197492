//! Authorize handler

use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::info;

use super::{parse_payload, OcppCallError, OcppHandler};

pub async fn handle_authorize(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, OcppCallError> {
    let req: AuthorizeRequest = parse_payload(payload)?;

    let accepted = handler.service.authorize(&req.id_tag).await?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        id_tag = req.id_tag.as_str(),
        accepted,
        "Authorize"
    );

    let response = AuthorizeResponse {
        id_tag_info: IdTagInfo {
            status: if accepted {
                AuthorizationStatus::Accepted
            } else {
                AuthorizationStatus::Invalid
            },
            expiry_date: None,
            parent_id_tag: None,
        },
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
