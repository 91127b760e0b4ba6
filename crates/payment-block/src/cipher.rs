//! Credential Encryption
//!
//! Stored credential records are AES-256-GCM encrypted. `encrypted_data` is
//! the base64 ciphertext (tag appended), `iv` is the base64 12-byte nonce and
//! the plaintext is the JSON credential set.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::{ExposeSecret, SecretBox};
use serde_json::Value;

use crate::error::{PaymentError, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Decryption service for stored credential records
#[async_trait]
pub trait CredentialCipher: Send + Sync {
    /// Decrypt a record payload into structured data
    async fn decrypt(&self, encrypted_data: &str, iv: &str) -> Result<Value>;
}

/// Encrypted payload as stored alongside a record id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedPayload {
    pub encrypted_data: String,
    pub iv: String,
}

/// AES-256-GCM credential cipher
pub struct AesGcmCipher {
    key: SecretBox<[u8; KEY_LEN]>,
}

impl AesGcmCipher {
    /// Create from a 32-byte secret
    pub fn new(secret: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = secret.try_into().map_err(|_| {
            PaymentError::Config(format!(
                "encryption secret must be {KEY_LEN} bytes, got {}",
                secret.len()
            ))
        })?;

        Ok(Self {
            key: SecretBox::new(Box::new(key)),
        })
    }

    /// Create from the `ENCRYPTION_SECRET` environment variable
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("ENCRYPTION_SECRET")
            .map_err(|_| PaymentError::Config("ENCRYPTION_SECRET not set".into()))?;

        Self::new(secret.as_bytes())
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.expose_secret()))
    }

    /// Encrypt structured data with a fresh nonce
    pub fn seal(&self, data: &Value) -> Result<SealedPayload> {
        let plaintext = serde_json::to_vec(data)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| PaymentError::Decryption(format!("encryption failed: {e}")))?;

        Ok(SealedPayload {
            encrypted_data: BASE64.encode(ciphertext),
            iv: BASE64.encode(nonce),
        })
    }

    fn open(&self, encrypted_data: &str, iv: &str) -> Result<Vec<u8>> {
        let ciphertext = BASE64
            .decode(encrypted_data)
            .map_err(|e| PaymentError::Decryption(format!("invalid encrypted data: {e}")))?;
        let iv = BASE64
            .decode(iv)
            .map_err(|e| PaymentError::Decryption(format!("invalid iv: {e}")))?;

        if iv.len() != NONCE_LEN {
            return Err(PaymentError::Decryption(format!(
                "iv must be {NONCE_LEN} bytes, got {}",
                iv.len()
            )));
        }

        self.cipher()
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|e| PaymentError::Decryption(e.to_string()))
    }
}

#[async_trait]
impl CredentialCipher for AesGcmCipher {
    async fn decrypt(&self, encrypted_data: &str, iv: &str) -> Result<Value> {
        let plaintext = self.open(encrypted_data, iv)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}
