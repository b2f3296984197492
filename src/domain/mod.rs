//! Core business entities, repository traits, and domain errors.

pub mod error;
pub mod models;
pub mod repositories;

pub use error::{DomainError, DomainResult};
pub use models::*;
pub use repositories::*;
