//! CSMS binary entry point.
//!
//! Configuration comes from an optional TOML file
//! (`ESLATIN_CSMS_CONFIG` or the platform config dir) with
//! environment overrides on top.

use eslatin_csms::server::{init_tracing, ServerHandle, ServerOptions};
use eslatin_csms::{default_config_path, AppConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("ESLATIN_CSMS_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());

    let config = if config_path.exists() {
        match AppConfig::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                let config = AppConfig::from_env();
                init_tracing(&config);
                warn!("Failed to load config: {}. Using env/defaults.", e);
                run(config).await?;
                return Ok(());
            }
        }
    } else {
        AppConfig::from_env()
    };

    init_tracing(&config);
    info!("Configuration loaded (file: {})", config_path.display());
    run(config).await
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: true,
    })
    .await?;

    handle.install_signal_handler();

    let shutdown = handle.shutdown_signal();
    shutdown.wait().await;

    handle.shutdown().await;
    Ok(())
}
