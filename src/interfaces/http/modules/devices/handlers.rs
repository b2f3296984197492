//! Device provisioning and broker-auth handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;
use validator::Validate;

use crate::application::services::DeviceService;
use crate::domain::DomainError;
use crate::interfaces::http::common::ApiResponse;

use super::dto::{DeviceAuthRequest, DeviceCredentialsResponse, RegisterDeviceRequest};

#[derive(Clone)]
pub struct DeviceApiState {
    pub device_service: Arc<DeviceService>,
    /// Default master secret for devices registered without one.
    pub default_master_secret: String,
    pub mqtt_broker_host: String,
    pub mqtt_broker_port: u16,
}

fn detail(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": message.into() })))
}

fn map_domain_error(err: DomainError) -> (StatusCode, Json<Value>) {
    match &err {
        DomainError::NotFound { .. } => detail(StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Conflict(_) => detail(StatusCode::CONFLICT, err.to_string()),
        DomainError::AuthenticationFailed(_) => detail(StatusCode::UNAUTHORIZED, err.to_string()),
        _ => detail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/devices",
    tag = "Devices",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 200, description = "Device registered"),
        (status = 409, description = "Serial already registered")
    )
)]
pub async fn register_device(
    State(state): State<DeviceApiState>,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<Json<ApiResponse<DeviceCredentialsResponse>>, (StatusCode, Json<Value>)> {
    request
        .validate()
        .map_err(|e| detail(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let master_secret = request
        .master_secret
        .as_deref()
        .unwrap_or(&state.default_master_secret);

    let (device, credentials) = state
        .device_service
        .register_device(&request.serial_number, &request.device_type_code, master_secret)
        .await
        .map_err(map_domain_error)?;

    Ok(Json(ApiResponse::success(DeviceCredentialsResponse {
        serial_number: device.serial_number,
        device_type_code: device.type_code,
        mqtt_client_id: credentials.mqtt_client_id,
        mqtt_username: credentials.mqtt_username,
        mqtt_password: credentials.mqtt_password,
        mqtt_broker_host: state.mqtt_broker_host.clone(),
        mqtt_broker_port: state.mqtt_broker_port,
        is_active: device.is_active,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices/{serial_number}",
    tag = "Devices",
    params(("serial_number" = String, Path, description = "Device serial number")),
    responses(
        (status = 200, description = "Device credentials"),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn get_device(
    State(state): State<DeviceApiState>,
    Path(serial_number): Path<String>,
) -> Result<Json<DeviceCredentialsResponse>, (StatusCode, Json<Value>)> {
    let (device, credentials) = state
        .device_service
        .device_credentials(&serial_number)
        .await
        .map_err(map_domain_error)?;

    Ok(Json(DeviceCredentialsResponse {
        serial_number: device.serial_number,
        device_type_code: device.type_code,
        mqtt_client_id: credentials.mqtt_client_id,
        mqtt_username: credentials.mqtt_username,
        mqtt_password: credentials.mqtt_password,
        mqtt_broker_host: state.mqtt_broker_host.clone(),
        mqtt_broker_port: state.mqtt_broker_port,
        is_active: device.is_active,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/devices/auth",
    tag = "Devices",
    request_body = DeviceAuthRequest,
    responses(
        (status = 200, description = "Credentials valid"),
        (status = 401, description = "Credentials rejected")
    )
)]
pub async fn authenticate_device(
    State(state): State<DeviceApiState>,
    Json(request): Json<DeviceAuthRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state
        .device_service
        .verify(&request.client_id, &request.username, &request.password)
        .await
    {
        Ok(()) => Ok(Json(json!({ "result": "allow" }))),
        Err(e) => {
            warn!(client_id = request.client_id.as_str(), error = %e, "Device authentication rejected");
            Err(detail(StatusCode::UNAUTHORIZED, "AuthenticationFailed"))
        }
    }
}
