//! Operator OCPP command handlers
//!
//! `200 {success, data}` on a charger reply, `503 {detail}` when no
//! transport claims the charger, `504 {detail}` when the charger never
//! answers, `502 {detail}` when it answers with a CALLERROR.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use validator::Validate;

use crate::application::commands::{CommandError, ResetKind, SharedCommandDispatcher};
use crate::interfaces::http::common::ApiResponse;

use super::dto::{
    ChangeConfigurationRequest, CommandResult, GetConfigurationRequest, RemoteStartRequest,
    RemoteStopRequest, ResetRequest, UnlockConnectorRequest,
};

#[derive(Clone)]
pub struct OcppControlState {
    pub command_dispatcher: SharedCommandDispatcher,
}

type CommandReply<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<Value>)>;

fn detail(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": message.into() })))
}

fn map_command_error(err: CommandError) -> (StatusCode, Json<Value>) {
    match &err {
        CommandError::NotConnected(_) => detail(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        CommandError::Timeout => detail(StatusCode::GATEWAY_TIMEOUT, "RequestTimeout"),
        CommandError::ConnectionClosed => detail(StatusCode::BAD_GATEWAY, err.to_string()),
        CommandError::CallError { .. } => detail(StatusCode::BAD_GATEWAY, err.to_string()),
        CommandError::SendFailed(_) | CommandError::InvalidResponse(_) => {
            detail(StatusCode::BAD_GATEWAY, err.to_string())
        }
    }
}

fn check_connected(
    state: &OcppControlState,
    charge_point_id: &str,
) -> Result<(), (StatusCode, Json<Value>)> {
    if state.command_dispatcher.is_connected(charge_point_id) {
        Ok(())
    } else {
        Err(detail(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Charge point {} is not connected on any transport", charge_point_id),
        ))
    }
}

fn validate<T: Validate>(request: &T) -> Result<(), (StatusCode, Json<Value>)> {
    request
        .validate()
        .map_err(|e| detail(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
}

fn timeout_of(seconds: Option<u64>) -> Option<Duration> {
    seconds.map(Duration::from_secs)
}

#[utoipa::path(
    post,
    path = "/api/v1/ocpp/remote-start-transaction",
    tag = "OCPP Control",
    request_body = RemoteStartRequest,
    responses(
        (status = 200, description = "Charger replied"),
        (status = 503, description = "Charger not connected"),
        (status = 504, description = "Charger did not reply in time")
    )
)]
pub async fn remote_start(
    State(state): State<OcppControlState>,
    Json(request): Json<RemoteStartRequest>,
) -> CommandReply<CommandResult> {
    validate(&request)?;
    check_connected(&state, &request.charge_point_id)?;

    let (status, transport) = state
        .command_dispatcher
        .remote_start(
            &request.charge_point_id,
            &request.id_tag,
            request.connector_id,
            timeout_of(request.timeout_seconds),
        )
        .await
        .map_err(map_command_error)?;

    Ok(Json(ApiResponse::success(CommandResult {
        status,
        transport: transport.as_str().to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/ocpp/remote-stop-transaction",
    tag = "OCPP Control",
    request_body = RemoteStopRequest,
    responses(
        (status = 200, description = "Charger replied"),
        (status = 503, description = "Charger not connected"),
        (status = 504, description = "Charger did not reply in time")
    )
)]
pub async fn remote_stop(
    State(state): State<OcppControlState>,
    Json(request): Json<RemoteStopRequest>,
) -> CommandReply<CommandResult> {
    validate(&request)?;
    check_connected(&state, &request.charge_point_id)?;

    let (status, transport) = state
        .command_dispatcher
        .remote_stop(
            &request.charge_point_id,
            request.transaction_id,
            timeout_of(request.timeout_seconds),
        )
        .await
        .map_err(map_command_error)?;

    Ok(Json(ApiResponse::success(CommandResult {
        status,
        transport: transport.as_str().to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/ocpp/change-configuration",
    tag = "OCPP Control",
    request_body = ChangeConfigurationRequest,
    responses(
        (status = 200, description = "Charger replied"),
        (status = 503, description = "Charger not connected"),
        (status = 504, description = "Charger did not reply in time")
    )
)]
pub async fn change_configuration(
    State(state): State<OcppControlState>,
    Json(request): Json<ChangeConfigurationRequest>,
) -> CommandReply<CommandResult> {
    validate(&request)?;
    check_connected(&state, &request.charge_point_id)?;

    let (status, transport) = state
        .command_dispatcher
        .change_configuration(
            &request.charge_point_id,
            &request.key,
            &request.value,
            timeout_of(request.timeout_seconds),
        )
        .await
        .map_err(map_command_error)?;

    Ok(Json(ApiResponse::success(CommandResult {
        status,
        transport: transport.as_str().to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/ocpp/get-configuration",
    tag = "OCPP Control",
    request_body = GetConfigurationRequest,
    responses(
        (status = 200, description = "Charger replied"),
        (status = 503, description = "Charger not connected"),
        (status = 504, description = "Charger did not reply in time")
    )
)]
pub async fn get_configuration(
    State(state): State<OcppControlState>,
    Json(request): Json<GetConfigurationRequest>,
) -> CommandReply<Value> {
    validate(&request)?;
    check_connected(&state, &request.charge_point_id)?;

    let (configuration, transport) = state
        .command_dispatcher
        .get_configuration(
            &request.charge_point_id,
            request.keys.clone(),
            timeout_of(request.timeout_seconds),
        )
        .await
        .map_err(map_command_error)?;

    Ok(Json(ApiResponse::success(json!({
        "configuration": configuration,
        "transport": transport.as_str(),
    }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/ocpp/reset",
    tag = "OCPP Control",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Charger replied"),
        (status = 422, description = "Unknown reset type"),
        (status = 503, description = "Charger not connected"),
        (status = 504, description = "Charger did not reply in time")
    )
)]
pub async fn reset(
    State(state): State<OcppControlState>,
    Json(request): Json<ResetRequest>,
) -> CommandReply<CommandResult> {
    validate(&request)?;
    let kind = ResetKind::from_str(&request.reset_type).ok_or_else(|| {
        detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("type must be \"Hard\" or \"Soft\", got {:?}", request.reset_type),
        )
    })?;
    check_connected(&state, &request.charge_point_id)?;

    let (status, transport) = state
        .command_dispatcher
        .reset(&request.charge_point_id, kind, timeout_of(request.timeout_seconds))
        .await
        .map_err(map_command_error)?;

    Ok(Json(ApiResponse::success(CommandResult {
        status,
        transport: transport.as_str().to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/ocpp/unlock-connector",
    tag = "OCPP Control",
    request_body = UnlockConnectorRequest,
    responses(
        (status = 200, description = "Charger replied"),
        (status = 503, description = "Charger not connected"),
        (status = 504, description = "Charger did not reply in time")
    )
)]
pub async fn unlock_connector(
    State(state): State<OcppControlState>,
    Json(request): Json<UnlockConnectorRequest>,
) -> CommandReply<CommandResult> {
    validate(&request)?;
    check_connected(&state, &request.charge_point_id)?;

    let (status, transport) = state
        .command_dispatcher
        .unlock_connector(
            &request.charge_point_id,
            request.connector_id,
            timeout_of(request.timeout_seconds),
        )
        .await
        .map_err(map_command_error)?;

    Ok(Json(ApiResponse::success(CommandResult {
        status,
        transport: transport.as_str().to_string(),
    })))
}
