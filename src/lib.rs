//! # Eslatin CSMS
//!
//! OCPP 1.6 Charging Station Management System: a transport-agnostic
//! message broker and session/state engine for EV charging stations.
//!
//! ## Architecture
//!
//! - **support**: cross-cutting utilities (OCPP-J framing, time,
//!   shutdown)
//! - **domain**: entity models, repository traits, domain errors
//! - **application**: OCPP dispatcher and handlers, services,
//!   operator commands, connection registry
//! - **infrastructure**: credential engine, SeaORM database,
//!   in-memory storage
//! - **interfaces**: transport adapters (MQTT / WebSocket / HTTP) and
//!   the REST API
//! - **config / server**: configuration and server lifecycle

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod support;

// Re-export commonly used types at crate root
pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use interfaces::create_api_router;
pub use server::{init_tracing, ServerHandle, ServerOptions};
