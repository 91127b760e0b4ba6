//! Server Configuration
//!
//! Read from environment variables (a `.env` file is loaded first).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// 32-byte secret used to decrypt credential records
    pub encryption_secret: String,

    /// JSON file of encrypted credential records to load at startup
    pub credentials_file: Option<PathBuf>,

    /// Upper bound on a single gateway call
    pub gateway_timeout: Duration,

    /// Send internal error details to clients instead of a generic message
    pub expose_internal_errors: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let encryption_secret =
            lookup("ENCRYPTION_SECRET").ok_or(ConfigError::Missing("ENCRYPTION_SECRET"))?;

        let gateway_timeout = match lookup("GATEWAY_TIMEOUT_SECS") {
            Some(value) => value
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid { name: "GATEWAY_TIMEOUT_SECS", value })?,
            None => Duration::from_secs(30),
        };

        let expose_internal_errors = match lookup("EXPOSE_INTERNAL_ERRORS") {
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(ConfigError::Invalid { name: "EXPOSE_INTERNAL_ERRORS", value }),
            },
            None => false,
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            encryption_secret,
            credentials_file: lookup("CREDENTIALS_FILE").map(PathBuf::from),
            gateway_timeout,
            expose_internal_errors,
        })
    }
}
