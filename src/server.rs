//! Reusable CSMS server runtime.
//!
//! [`ServerHandle`] encapsulates the full lifecycle: database init,
//! migrations, transport adapters, REST API, and graceful shutdown
//! (stop accepting → drain pending calls → close adapters).

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::commands::{create_command_dispatcher, SharedCommandDispatcher};
use crate::application::dispatcher::OcppDispatcher;
use crate::application::services::{BillingService, ChargePointService, DeviceService};
use crate::application::session::{ConnectionRegistry, SharedConnectionRegistry};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::CredentialEngine;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
use crate::interfaces::http::{create_api_router, ApiContext};
use crate::interfaces::transport::http::HttpTransport;
use crate::interfaces::transport::mqtt::{MqttSettings, MqttTransport};
use crate::interfaces::transport::websocket::WebSocketTransport;
use crate::interfaces::transport::{
    PendingResponseRegistry, SharedPendingRegistry, SharedTransportManager, TransportAdapter,
    TransportContext, TransportManager, DEFAULT_CALL_TIMEOUT,
};
use crate::support::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────

/// Options for starting the CSMS.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────

/// Handle to a running CSMS.
pub struct ServerHandle {
    pub repos: Arc<dyn RepositoryProvider>,
    pub connections: SharedConnectionRegistry,
    pub transport_manager: SharedTransportManager,
    pub command_dispatcher: SharedCommandDispatcher,
    pub config: AppConfig,

    pending: SharedPendingRegistry,
    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the CSMS with the given options.
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let config = opts.config;

        info!("Starting Eslatin CSMS...");

        // ── Prometheus metrics recorder ────────────────────
        // The global recorder can only be installed once per process;
        // reuse it on restart within the same process.
        use std::sync::OnceLock;
        static PROM_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
            OnceLock::new();
        let prometheus_handle = PROM_HANDLE
            .get_or_init(|| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .install_recorder()
                    .expect("Failed to install Prometheus metrics recorder")
            })
            .clone();

        // ── Database ───────────────────────────────────────
        let db_config = DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
        };
        let db = init_database(&db_config).await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        // ── Repositories & services ────────────────────────
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let credential_engine = Arc::new(CredentialEngine::new(
            &config.security.encryption_key,
            &config.security.encryption_salt,
        ));
        let service = Arc::new(ChargePointService::new(repos.clone()));
        let billing = Arc::new(BillingService::new(repos.clone()));
        let device_service = Arc::new(DeviceService::new(repos.clone(), credential_engine));

        // ── Shared transport context ───────────────────────
        let dispatcher =
            OcppDispatcher::shared(service, billing, config.ocpp.heartbeat_interval);
        let pending = PendingResponseRegistry::shared();
        let connections = ConnectionRegistry::shared();
        let ctx = TransportContext::new(dispatcher, pending.clone(), connections.clone());

        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Transport adapters (per enabled flags) ─────────
        let mut manager = TransportManager::new(connections.clone());

        if config.transports.mqtt {
            let mqtt = Arc::new(MqttTransport::new(
                ctx.clone(),
                MqttSettings {
                    broker_host: config.mqtt.broker_host.clone(),
                    broker_port: config.mqtt.broker_port,
                    client_id: config.mqtt.client_id.clone(),
                },
                shutdown_signal.clone(),
            ));
            mqtt.start().await?;
            manager.register(mqtt);
        }

        if config.transports.websocket {
            let ws_addr = format!("{}:{}", config.server.ws_host, config.server.ws_port);
            let ws = Arc::new(WebSocketTransport::new(
                ctx.clone(),
                ws_addr,
                shutdown_signal.clone(),
            ));
            ws.start().await?;
            manager.register(ws);
        }

        let http_transport = if config.transports.http {
            let http = Arc::new(HttpTransport::new(ctx.clone()));
            http.start().await?;
            manager.register(http.clone());
            Some(http)
        } else {
            None
        };

        let transport_manager: SharedTransportManager = Arc::new(manager);
        let command_dispatcher = create_command_dispatcher(transport_manager.clone());

        // ── REST API server ────────────────────────────────
        let api_router = create_api_router(ApiContext {
            repos: repos.clone(),
            connections: connections.clone(),
            command_dispatcher: command_dispatcher.clone(),
            device_service,
            default_master_secret: config.security.default_master_secret.clone(),
            mqtt_broker_host: config.mqtt.broker_host.clone(),
            mqtt_broker_port: config.mqtt.broker_port,
            prometheus_handle,
            http_transport,
        });

        let api_addr = format!("{}:{}", config.server.api_host, config.server.api_port);
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("All servers started");

        Ok(Self {
            repos,
            connections,
            transport_manager,
            command_dispatcher,
            config,
            pending,
            db,
            shutdown,
            api_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger
    /// shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown and wait for everything to stop.
    ///
    /// Order: stop accepting new connections, drain the
    /// pending-response registry up to the maximum call timeout,
    /// close the adapters, stop the API server, close the database.
    /// The whole cleanup is bounded by the coordinator's timeout.
    pub async fn shutdown(self) {
        info!("Shutting down CSMS...");

        let Self {
            pending,
            transport_manager,
            api_task,
            db,
            shutdown,
            ..
        } = self;

        shutdown.signal().trigger();

        shutdown
            .shutdown_with_cleanup(|| async move {
                // Drain in-flight outbound calls before tearing
                // transports down.
                let drain_deadline = tokio::time::Instant::now() + DEFAULT_CALL_TIMEOUT;
                while !pending.is_empty() && tokio::time::Instant::now() < drain_deadline {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                if !pending.is_empty() {
                    warn!(
                        remaining = pending.len(),
                        "Pending calls not drained before timeout"
                    );
                }

                transport_manager.stop_all().await;

                if let Err(e) = api_task.await {
                    error!("REST API task panicked: {}", e);
                }

                if let Err(e) = db.close().await {
                    warn!("Error closing database connection: {}", e);
                } else {
                    info!("Database connection closed");
                }
            })
            .await;

        info!("CSMS shutdown complete");
    }
}

/// Initialize tracing (logging) from the application config.
///
/// Call once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
