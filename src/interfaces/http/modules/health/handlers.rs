//! Health and metrics endpoints

use axum::extract::State;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};

use crate::support::time::utc_now_string;

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": utc_now_string(),
    }))
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
