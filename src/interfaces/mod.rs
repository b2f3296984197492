//! Delivery mechanisms: transport adapters and the REST API.

pub mod http;
pub mod transport;

pub use http::create_api_router;
