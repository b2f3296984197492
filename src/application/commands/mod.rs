//! CS→CP operator commands
//!
//! Typed wrappers that marshal `rust_ocpp::v1_6` request/response
//! payloads over the transport manager. The REST layer only ever
//! talks to [`CommandDispatcher`].

mod change_configuration;
mod dispatcher;
mod get_configuration;
mod remote_start;
mod remote_stop;
mod reset;
mod unlock_connector;

use thiserror::Error;

use crate::interfaces::transport::TransportError;

pub use change_configuration::change_configuration;
pub use dispatcher::{create_command_dispatcher, CommandDispatcher, SharedCommandDispatcher};
pub use get_configuration::{get_configuration, ConfigurationResult, KeyValue};
pub use remote_start::remote_start_transaction;
pub use remote_stop::remote_stop_transaction;
pub use reset::{reset, ResetKind};
pub use unlock_connector::unlock_connector;

/// Failures surfaced to operator API callers.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Charge point {0} is not connected")]
    NotConnected(String),

    #[error("Response timeout")]
    Timeout,

    #[error("Connection closed while waiting for response")]
    ConnectionClosed,

    #[error("Failed to send: {0}")]
    SendFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("CallError {code}: {description}")]
    CallError { code: String, description: String },
}

impl From<TransportError> for CommandError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected(id) => Self::NotConnected(id),
            TransportError::RequestTimeout => Self::Timeout,
            TransportError::ConnectionClosed => Self::ConnectionClosed,
            TransportError::SendFailed(msg) => Self::SendFailed(msg),
            TransportError::CallError { code, description } => {
                Self::CallError { code, description }
            }
        }
    }
}
