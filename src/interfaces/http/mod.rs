//! HTTP REST API interfaces
//!
//! - `common`: shared response envelope
//! - `modules`: per-resource handlers and DTOs
//! - `router`: single API router assembly (incl. Swagger UI and the
//!   HTTP transport's charger endpoints)

pub mod common;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiContext};
