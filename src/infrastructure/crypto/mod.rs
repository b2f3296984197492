pub mod device_credentials;

pub use device_credentials::{derive_password, parse_client_id, CredentialEngine};
