//! Connection tracking for charge point sessions.

mod registry;

pub use registry::{ClaimInfo, ConnectionRegistry, SharedConnectionRegistry, TransportType};
