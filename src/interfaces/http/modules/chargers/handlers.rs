//! Charger read endpoints — thin repository views for operators.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::application::session::SharedConnectionRegistry;
use crate::domain::{ChargePoint, ChargingSession, EvseStatus, RepositoryProvider};
use crate::interfaces::http::common::ApiResponse;
use crate::support::time::format_utc;

#[derive(Clone)]
pub struct ChargerApiState {
    pub repos: Arc<dyn RepositoryProvider>,
    pub connections: SharedConnectionRegistry,
}

fn detail(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": message.into() })))
}

fn charge_point_view(cp: &ChargePoint, connected: bool) -> Value {
    json!({
        "id": cp.id,
        "siteId": cp.site_id,
        "vendor": cp.vendor,
        "model": cp.model,
        "serialNumber": cp.serial_number,
        "firmwareVersion": cp.firmware_version,
        "registration": cp.registration.as_str(),
        "lastSeen": cp.last_seen.map(format_utc),
        "connected": connected,
    })
}

fn status_view(status: &EvseStatus) -> Value {
    json!({
        "evseId": status.evse_id,
        "status": status.status.as_str(),
        "errorCode": status.error_code,
        "lastSeen": format_utc(status.last_seen),
    })
}

fn session_view(session: &ChargingSession) -> Value {
    json!({
        "transactionId": session.transaction_id,
        "evseId": session.evse_id,
        "idTag": session.id_tag,
        "startTime": format_utc(session.start_time),
        "endTime": session.end_time.map(format_utc),
        "meterStart": session.meter_start,
        "meterStop": session.meter_stop,
        "energyWh": session.energy_wh(),
        "status": session.status.as_str(),
        "stopReason": session.stop_reason,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/chargers",
    tag = "Chargers",
    responses((status = 200, description = "All known charge points"))
)]
pub async fn list_chargers(
    State(state): State<ChargerApiState>,
) -> Result<Json<ApiResponse<Vec<Value>>>, (StatusCode, Json<Value>)> {
    let charge_points = state
        .repos
        .charge_points()
        .find_all()
        .await
        .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let views = charge_points
        .iter()
        .map(|cp| charge_point_view(cp, state.connections.is_connected(&cp.id)))
        .collect();

    Ok(Json(ApiResponse::success(views)))
}

#[utoipa::path(
    get,
    path = "/api/v1/chargers/{charge_point_id}/status",
    tag = "Chargers",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    responses(
        (status = 200, description = "EVSE statuses and connectivity"),
        (status = 404, description = "Unknown charge point")
    )
)]
pub async fn charger_status(
    State(state): State<ChargerApiState>,
    Path(charge_point_id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, (StatusCode, Json<Value>)> {
    let cp = state
        .repos
        .charge_points()
        .find_by_id(&charge_point_id)
        .await
        .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| {
            detail(
                StatusCode::NOT_FOUND,
                format!("Charge point {} not found", charge_point_id),
            )
        })?;

    let statuses = state
        .repos
        .evses()
        .statuses_for_charge_point(&charge_point_id)
        .await
        .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let transports: Vec<&str> = state
        .connections
        .transports_for(&charge_point_id)
        .iter()
        .map(|t| t.as_str())
        .collect();

    Ok(Json(ApiResponse::success(json!({
        "chargePoint": charge_point_view(&cp, !transports.is_empty()),
        "transports": transports,
        "evseStatuses": statuses.iter().map(status_view).collect::<Vec<_>>(),
    }))))
}

#[utoipa::path(
    get,
    path = "/api/v1/chargers/{charge_point_id}/transactions",
    tag = "Chargers",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    responses((status = 200, description = "Charging sessions, newest first"))
)]
pub async fn charger_transactions(
    State(state): State<ChargerApiState>,
    Path(charge_point_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Value>>>, (StatusCode, Json<Value>)> {
    let sessions = state
        .repos
        .sessions()
        .find_for_charge_point(&charge_point_id)
        .await
        .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ApiResponse::success(
        sessions.iter().map(session_view).collect(),
    )))
}
