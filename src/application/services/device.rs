//! Device provisioning and credential verification

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::{Device, DomainError, DomainResult, RepositoryProvider};
use crate::infrastructure::crypto::{derive_password, parse_client_id, CredentialEngine};

/// Connect material handed to a device at provisioning time.
#[derive(Debug, Clone)]
pub struct DeviceCredentials {
    pub mqtt_client_id: String,
    pub mqtt_username: String,
    pub mqtt_password: String,
}

pub struct DeviceService {
    repos: Arc<dyn RepositoryProvider>,
    engine: Arc<CredentialEngine>,
}

impl DeviceService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, engine: Arc<CredentialEngine>) -> Self {
        Self { repos, engine }
    }

    /// Provision a device: seal the type-wide master secret and store
    /// the canonical MQTT identity.
    pub async fn register_device(
        &self,
        serial_number: &str,
        type_code: &str,
        master_secret: &str,
    ) -> DomainResult<(Device, DeviceCredentials)> {
        if self
            .repos
            .devices()
            .find_by_serial(serial_number)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "device {} already registered",
                serial_number
            )));
        }

        let device = Device {
            serial_number: serial_number.to_string(),
            type_code: type_code.to_string(),
            mqtt_client_id: Device::client_id_for(type_code, serial_number),
            mqtt_username: serial_number.to_string(),
            master_secret_enc: self.engine.encrypt_master_secret(master_secret)?,
            encryption_algorithm: "AES-256-GCM".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.repos.devices().save(device.clone()).await?;

        info!(serial_number, type_code, "Device registered");

        let credentials = DeviceCredentials {
            mqtt_client_id: device.mqtt_client_id.clone(),
            mqtt_username: device.mqtt_username.clone(),
            mqtt_password: derive_password(master_secret, serial_number),
        };
        Ok((device, credentials))
    }

    /// Re-derive the connect credentials for a provisioned device.
    pub async fn device_credentials(
        &self,
        serial_number: &str,
    ) -> DomainResult<(Device, DeviceCredentials)> {
        let device = self
            .repos
            .devices()
            .find_by_serial(serial_number)
            .await?
            .ok_or_else(|| DomainError::not_found("Device", "serial_number", serial_number))?;

        let master_secret = self.engine.decrypt_master_secret(&device.master_secret_enc)?;
        let credentials = DeviceCredentials {
            mqtt_client_id: device.mqtt_client_id.clone(),
            mqtt_username: device.mqtt_username.clone(),
            mqtt_password: derive_password(&master_secret, serial_number),
        };
        Ok((device, credentials))
    }

    /// Verify a transport handshake. Used by the MQTT broker's
    /// authentication callback.
    pub async fn verify(
        &self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> DomainResult<()> {
        let (_, serial) = parse_client_id(client_id)
            .ok_or_else(|| DomainError::AuthenticationFailed("malformed client id".into()))?;

        let device = self
            .repos
            .devices()
            .find_by_serial(serial)
            .await?
            .ok_or_else(|| DomainError::AuthenticationFailed("unknown device".into()))?;

        self.engine.verify(&device, client_id, username, password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RepositoryProvider;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn service() -> DeviceService {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let engine = Arc::new(CredentialEngine::new("test-key", "test-salt-0123456789"));
        DeviceService::new(repos, engine)
    }

    #[tokio::test]
    async fn register_then_verify_roundtrip() {
        let service = service();

        let (device, credentials) = service
            .register_device("861076087029615", "zcf", "type-wide-master-secret")
            .await
            .unwrap();

        assert_eq!(device.mqtt_client_id, "zcf&861076087029615");
        assert_eq!(credentials.mqtt_username, "861076087029615");
        assert_eq!(credentials.mqtt_password.len(), 12);

        service
            .verify(
                &credentials.mqtt_client_id,
                &credentials.mqtt_username,
                &credentials.mqtt_password,
            )
            .await
            .unwrap();

        // Credentials are re-derivable, not stored.
        let (_, again) = service.device_credentials("861076087029615").await.unwrap();
        assert_eq!(again.mqtt_password, credentials.mqtt_password);
    }

    #[tokio::test]
    async fn verify_rejects_unknown_device_and_duplicate_registration() {
        let service = service();

        let err = service
            .verify("zcf&000", "000", "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AuthenticationFailed(_)));

        service
            .register_device("861076087029615", "zcf", "secret")
            .await
            .unwrap();
        let err = service
            .register_device("861076087029615", "zcf", "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
