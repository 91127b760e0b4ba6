//! Stripe Credentials
//!
//! Credentials are stored encrypted, keyed by id, and decrypted fresh for
//! every request. A decrypted [`CredentialSet`] is consumed by
//! [`CredentialSet::select`]; only the chosen key pair outlives that call,
//! and it is dropped when the request finishes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::cipher::{CredentialCipher, SealedPayload};
use crate::error::{PaymentError, Result};

/// Encrypted credential record as persisted by the credential store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub id: String,
    pub encrypted_data: String,
    pub iv: String,
}

impl CredentialRecord {
    pub fn new(id: impl Into<String>, payload: SealedPayload) -> Self {
        Self {
            id: id.into(),
            encrypted_data: payload.encrypted_data,
            iv: payload.iv,
        }
    }
}

/// Key pair for one Stripe environment
#[derive(Debug, Default)]
pub struct EnvironmentKeys {
    pub secret_key: Option<SecretString>,
    pub public_key: Option<String>,
}

/// Decrypted test + live credentials
#[derive(Debug, Default)]
pub struct CredentialSet {
    pub test: Option<EnvironmentKeys>,
    pub live: Option<EnvironmentKeys>,
}

/// Keys chosen for a single gateway call
#[derive(Debug)]
pub struct SelectedKeys {
    pub secret_key: SecretString,
    pub public_key: String,
    pub environment: Environment,
}

/// Which credential environment was selected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Test,
    Live,
}

impl Environment {
    pub fn as_str(&self) -> &str {
        match self {
            Environment::Test => "test",
            Environment::Live => "live",
        }
    }
}

// Wire shape of the decrypted payload. Kept private so plain strings never
// leave this module.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKeys {
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    public_key: Option<String>,
}

#[derive(Deserialize)]
struct RawCredentials {
    #[serde(default)]
    test: Option<RawKeys>,
    #[serde(default)]
    live: Option<RawKeys>,
}

impl From<RawKeys> for EnvironmentKeys {
    fn from(raw: RawKeys) -> Self {
        Self {
            secret_key: raw.secret_key.filter(|k| !k.is_empty()).map(SecretString::from),
            public_key: raw.public_key.filter(|k| !k.is_empty()),
        }
    }
}

impl CredentialSet {
    /// Build from the decrypted JSON payload
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawCredentials = serde_json::from_value(value)?;
        Ok(Self {
            test: raw.test.map(EnvironmentKeys::from),
            live: raw.live.map(EnvironmentKeys::from),
        })
    }

    /// Pick the key pair for this request.
    ///
    /// Preview requests use the test secret when one exists. The public key
    /// is picked separately: preview requests use the test public key when
    /// one exists, whichever secret was chosen, and fall back to the live one.
    pub fn select(self, is_preview: bool) -> Result<SelectedKeys> {
        let (test_secret, test_public) = match self.test {
            Some(keys) => (keys.secret_key, keys.public_key),
            None => (None, None),
        };
        let (live_secret, live_public) = match self.live {
            Some(keys) => (keys.secret_key, keys.public_key),
            None => (None, None),
        };

        let (secret_key, environment) = match test_secret {
            Some(secret) if is_preview => (secret, Environment::Test),
            _ => (
                live_secret.ok_or_else(|| {
                    PaymentError::Authorization("live secret key is missing".into())
                })?,
                Environment::Live,
            ),
        };

        let public_key = if is_preview {
            test_public.or(live_public)
        } else {
            live_public
        }
        .ok_or_else(|| PaymentError::Authorization("public key is missing".into()))?;

        Ok(SelectedKeys {
            secret_key,
            public_key,
            environment,
        })
    }
}

/// Credential record storage
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Get record by id
    async fn get(&self, id: &str) -> Result<Option<CredentialRecord>>;
}

/// In-memory credential store (for development)
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Build a store holding `records`
    pub fn with_records(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();

        Self {
            records: RwLock::new(records),
        }
    }

    /// Load records from a JSON array file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PaymentError::Storage(format!("{}: {e}", path.display())))?;
        let records: Vec<CredentialRecord> = serde_json::from_str(&contents)?;

        Ok(Self::with_records(records))
    }

    /// Save or replace a record
    pub fn save(&self, record: CredentialRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| PaymentError::Storage("credential store lock poisoned".into()))?;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| PaymentError::Storage("credential store lock poisoned".into()))?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, id: &str) -> Result<Option<CredentialRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| PaymentError::Storage("credential store lock poisoned".into()))?;
        Ok(records.get(id).cloned())
    }
}

/// Looks up and decrypts credential records
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    cipher: Arc<dyn CredentialCipher>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>, cipher: Arc<dyn CredentialCipher>) -> Self {
        Self { store, cipher }
    }

    /// Resolve a credential set. `None` when no record has this id.
    pub async fn resolve(&self, credentials_id: &str) -> Result<Option<CredentialSet>> {
        let Some(record) = self.store.get(credentials_id).await? else {
            tracing::debug!(credentials_id, "Credential record not found");
            return Ok(None);
        };

        let decrypted = self.cipher.decrypt(&record.encrypted_data, &record.iv).await?;
        CredentialSet::from_value(decrypted).map(Some)
    }
}
