//! Device credential engine
//!
//! Derives and verifies per-device MQTT passwords from an encrypted
//! type-wide master secret:
//!
//! - password = `Base64(HMAC-SHA256(masterSecret, serialNumber))[0..12]`
//! - master secrets are sealed with AES-256-GCM under a key obtained
//!   via PBKDF2-HMAC-SHA256(processKey, salt, 100 000 iterations);
//!   at rest: `base64(nonce || ciphertext)`.
//!
//! Decryption failure is a hard credential error, never an empty
//! secret. Password comparison is constant-time.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::{Device, DomainError, DomainResult};

const PBKDF2_ITERATIONS: u32 = 100_000;
const DERIVED_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const PASSWORD_LEN: usize = 12;
const SALT_LEN: usize = 16;

/// Derive a device's MQTT password from the plaintext master secret
/// and its serial number. Deterministic and byte-for-byte stable.
pub fn derive_password(master_secret: &str, serial_number: &str) -> String {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(master_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(serial_number.as_bytes());
    let digest = mac.finalize().into_bytes();

    let encoded = BASE64.encode(digest);
    encoded[..PASSWORD_LEN].to_string()
}

/// Parse an MQTT client id of the canonical `"{typeCode}&{serial}"`
/// form.
pub fn parse_client_id(client_id: &str) -> Option<(&str, &str)> {
    let (type_code, serial) = client_id.split_once('&')?;
    if type_code.is_empty() || serial.is_empty() {
        return None;
    }
    Some((type_code, serial))
}

/// Seals and verifies device master secrets.
pub struct CredentialEngine {
    cipher: Aes256Gcm,
}

impl CredentialEngine {
    /// Build the engine from the process-wide `ENCRYPTION_KEY` and
    /// `ENCRYPTION_SALT` values. The AES key is derived once via
    /// PBKDF2 over the first 16 bytes of the salt.
    pub fn new(encryption_key: &str, encryption_salt: &str) -> Self {
        let salt_bytes = encryption_salt.as_bytes();
        let salt = &salt_bytes[..salt_bytes.len().min(SALT_LEN)];

        let mut key = [0u8; DERIVED_KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            encryption_key.as_bytes(),
            salt,
            PBKDF2_ITERATIONS,
            &mut key,
        );

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        Self { cipher }
    }

    /// Seal a plaintext master secret for storage.
    /// Output is `base64(nonce || ciphertext)` with a fresh random
    /// nonce per value.
    pub fn encrypt_master_secret(&self, plain_secret: &str) -> DomainResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plain_secret.as_bytes())
            .map_err(|_| DomainError::Credential("master secret encryption failed".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Unseal a stored master secret.
    pub fn decrypt_master_secret(&self, sealed: &str) -> DomainResult<String> {
        let bytes = BASE64
            .decode(sealed)
            .map_err(|_| DomainError::Credential("sealed master secret is not base64".into()))?;
        if bytes.len() <= NONCE_LEN {
            return Err(DomainError::Credential(
                "sealed master secret is truncated".into(),
            ));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| DomainError::Credential("master secret decryption failed".into()))?;

        String::from_utf8(plain)
            .map_err(|_| DomainError::Credential("decrypted master secret is not UTF-8".into()))
    }

    /// Verify a transport handshake `(clientId, username, password)`
    /// against a loaded device record.
    pub fn verify(
        &self,
        device: &Device,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> DomainResult<()> {
        let (type_code, serial) = parse_client_id(client_id)
            .ok_or_else(|| DomainError::AuthenticationFailed("malformed client id".into()))?;

        if !device.is_active {
            return Err(DomainError::AuthenticationFailed("device is inactive".into()));
        }
        if type_code != device.type_code || serial != device.serial_number {
            return Err(DomainError::AuthenticationFailed(
                "client id does not match device".into(),
            ));
        }
        if username != device.mqtt_username {
            return Err(DomainError::AuthenticationFailed("username mismatch".into()));
        }

        let master_secret = self.decrypt_master_secret(&device.master_secret_enc)?;
        let expected = derive_password(&master_secret, &device.serial_number);

        if expected.as_bytes().ct_eq(password.as_bytes()).into() {
            Ok(())
        } else {
            Err(DomainError::AuthenticationFailed("password mismatch".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const MASTER_SECRET: &str = "test_master_secret_12345678901234567890";
    const SERIAL: &str = "861076087029615";

    fn engine() -> CredentialEngine {
        CredentialEngine::new("unit-test-encryption-key", "unit-test-salt-0123456789")
    }

    fn device(engine: &CredentialEngine) -> Device {
        Device {
            serial_number: SERIAL.to_string(),
            type_code: "zcf".to_string(),
            mqtt_client_id: Device::client_id_for("zcf", SERIAL),
            mqtt_username: SERIAL.to_string(),
            master_secret_enc: engine.encrypt_master_secret(MASTER_SECRET).unwrap(),
            encryption_algorithm: "AES-256-GCM".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_is_deterministic_12_chars() {
        let first = derive_password(MASTER_SECRET, SERIAL);
        let second = derive_password(MASTER_SECRET, SERIAL);
        assert_eq!(first.len(), 12);
        assert_eq!(first, second);
    }

    #[test]
    fn password_depends_on_serial_and_secret() {
        let base = derive_password(MASTER_SECRET, SERIAL);
        assert_ne!(base, derive_password(MASTER_SECRET, "861076087029616"));
        assert_ne!(base, derive_password("another_master_secret", SERIAL));
    }

    #[test]
    fn encrypt_then_decrypt_is_identity() {
        let engine = engine();
        let sealed = engine.encrypt_master_secret(MASTER_SECRET).unwrap();
        assert_ne!(sealed, MASTER_SECRET);
        assert_eq!(engine.decrypt_master_secret(&sealed).unwrap(), MASTER_SECRET);
    }

    #[test]
    fn fresh_nonce_per_value() {
        let engine = engine();
        let a = engine.encrypt_master_secret(MASTER_SECRET).unwrap();
        let b = engine.encrypt_master_secret(MASTER_SECRET).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_garbage_is_an_error() {
        let engine = engine();
        assert!(engine.decrypt_master_secret("not base64 at all!").is_err());
        assert!(engine.decrypt_master_secret("AAAA").is_err());

        // Valid base64 but wrong key material
        let other = CredentialEngine::new("different-key", "unit-test-salt-0123456789");
        let sealed = other.encrypt_master_secret(MASTER_SECRET).unwrap();
        assert!(engine.decrypt_master_secret(&sealed).is_err());
    }

    #[test]
    fn parse_client_id_forms() {
        assert_eq!(parse_client_id("zcf&861076087029615"), Some(("zcf", "861076087029615")));
        assert_eq!(parse_client_id("zcf861076087029615"), None);
        assert_eq!(parse_client_id("&serial"), None);
        assert_eq!(parse_client_id("type&"), None);
    }

    #[test]
    fn verify_accepts_derived_password() {
        let engine = engine();
        let device = device(&engine);
        let password = derive_password(MASTER_SECRET, SERIAL);

        engine
            .verify(&device, &device.mqtt_client_id, SERIAL, &password)
            .unwrap();
    }

    #[test]
    fn verify_rejects_wrong_password_and_inactive_device() {
        let engine = engine();
        let mut device = device(&engine);

        let err = engine
            .verify(&device, &device.mqtt_client_id, SERIAL, "wrong-password")
            .unwrap_err();
        assert!(matches!(err, DomainError::AuthenticationFailed(_)));

        device.is_active = false;
        let password = derive_password(MASTER_SECRET, SERIAL);
        let err = engine
            .verify(&device, &device.mqtt_client_id, SERIAL, &password)
            .unwrap_err();
        assert!(matches!(err, DomainError::AuthenticationFailed(_)));
    }
}
