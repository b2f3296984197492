//! API router with Swagger UI
//!
//! One assembly for everything HTTP: operator OCPP control, device
//! provisioning, charger views, health/metrics, and the HTTP
//! transport's charger-facing endpoints (mounted exactly once).

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::commands::SharedCommandDispatcher;
use crate::application::services::DeviceService;
use crate::application::session::SharedConnectionRegistry;
use crate::domain::RepositoryProvider;
use crate::interfaces::transport::http::HttpTransport;

use super::modules::{chargers, devices, health, ocpp_control};

/// Everything the API router needs, injected by the server bootstrap.
pub struct ApiContext {
    pub repos: Arc<dyn RepositoryProvider>,
    pub connections: SharedConnectionRegistry,
    pub command_dispatcher: SharedCommandDispatcher,
    pub device_service: Arc<DeviceService>,
    pub default_master_secret: String,
    pub mqtt_broker_host: String,
    pub mqtt_broker_port: u16,
    pub prometheus_handle: PrometheusHandle,
    /// Present when the HTTP transport is enabled.
    pub http_transport: Option<Arc<HttpTransport>>,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Eslatin CSMS API",
        description = "OCPP 1.6 central system: operator commands, device provisioning, charger state"
    ),
    paths(
        ocpp_control::handlers::remote_start,
        ocpp_control::handlers::remote_stop,
        ocpp_control::handlers::change_configuration,
        ocpp_control::handlers::get_configuration,
        ocpp_control::handlers::reset,
        ocpp_control::handlers::unlock_connector,
        devices::handlers::register_device,
        devices::handlers::get_device,
        devices::handlers::authenticate_device,
        chargers::handlers::list_chargers,
        chargers::handlers::charger_status,
        chargers::handlers::charger_transactions,
        health::handlers::health,
    ),
    components(schemas(
        ocpp_control::dto::RemoteStartRequest,
        ocpp_control::dto::RemoteStopRequest,
        ocpp_control::dto::ChangeConfigurationRequest,
        ocpp_control::dto::GetConfigurationRequest,
        ocpp_control::dto::ResetRequest,
        ocpp_control::dto::UnlockConnectorRequest,
        ocpp_control::dto::CommandResult,
        devices::dto::RegisterDeviceRequest,
        devices::dto::DeviceCredentialsResponse,
        devices::dto::DeviceAuthRequest,
    ))
)]
struct ApiDoc;

/// Assemble the full API router.
pub fn create_api_router(ctx: ApiContext) -> Router {
    let ocpp_control_state = ocpp_control::OcppControlState {
        command_dispatcher: ctx.command_dispatcher,
    };
    let ocpp_control_routes = Router::new()
        .route(
            "/api/v1/ocpp/remote-start-transaction",
            post(ocpp_control::handlers::remote_start),
        )
        .route(
            "/api/v1/ocpp/remote-stop-transaction",
            post(ocpp_control::handlers::remote_stop),
        )
        .route(
            "/api/v1/ocpp/change-configuration",
            post(ocpp_control::handlers::change_configuration),
        )
        .route(
            "/api/v1/ocpp/get-configuration",
            post(ocpp_control::handlers::get_configuration),
        )
        .route("/api/v1/ocpp/reset", post(ocpp_control::handlers::reset))
        .route(
            "/api/v1/ocpp/unlock-connector",
            post(ocpp_control::handlers::unlock_connector),
        )
        .with_state(ocpp_control_state);

    let device_state = devices::DeviceApiState {
        device_service: ctx.device_service,
        default_master_secret: ctx.default_master_secret,
        mqtt_broker_host: ctx.mqtt_broker_host,
        mqtt_broker_port: ctx.mqtt_broker_port,
    };
    let device_routes = Router::new()
        .route("/api/v1/devices", post(devices::handlers::register_device))
        .route(
            "/api/v1/devices/auth",
            post(devices::handlers::authenticate_device),
        )
        .route(
            "/api/v1/devices/{serial_number}",
            get(devices::handlers::get_device),
        )
        .with_state(device_state);

    let charger_state = chargers::ChargerApiState {
        repos: ctx.repos,
        connections: ctx.connections,
    };
    let charger_routes = Router::new()
        .route("/api/v1/chargers", get(chargers::handlers::list_chargers))
        .route(
            "/api/v1/chargers/{charge_point_id}/status",
            get(chargers::handlers::charger_status),
        )
        .route(
            "/api/v1/chargers/{charge_point_id}/transactions",
            get(chargers::handlers::charger_transactions),
        )
        .with_state(charger_state);

    let health_routes = Router::new()
        .route("/health", get(health::handlers::health))
        .merge(
            Router::new()
                .route("/metrics", get(health::handlers::metrics))
                .with_state(ctx.prometheus_handle),
        );

    let mut router = Router::new()
        .merge(ocpp_control_routes)
        .merge(device_routes)
        .merge(charger_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Charger-facing long-poll endpoints share the API port; mounted
    // once, from this single assembly.
    if let Some(http_transport) = ctx.http_transport {
        router = router.merge(HttpTransport::router(http_transport));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
