//! Payment Error Types
//!
//! Every failure in the pipeline ends up as a [`PaymentError`], and
//! [`PaymentError::normalize`] maps it to the single [`NormalizedError`] shape
//! returned to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::GatewayError;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Amount expression did not resolve to a usable number
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credentials id missing, or credentials absent/unusable
    #[error("Unauthorized: {0}")]
    Authorization(String),

    /// Failure reported by the payment gateway
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Credential record could not be decrypted
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Decrypted payload did not match the credential shape
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Credential store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl PaymentError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> u16 {
        self.normalize().status_code
    }

    /// Classify into the single error shape returned to callers.
    ///
    /// Structured gateway rejections keep their own status, type and
    /// parameter. Validation and authorization failures map to 400 and 403.
    /// Everything else is an internal error carrying its display message.
    pub fn normalize(&self) -> NormalizedError {
        match self {
            PaymentError::Validation(msg) => NormalizedError {
                status_code: 400,
                name: "validation".into(),
                message: msg.clone(),
            },
            PaymentError::Authorization(msg) => NormalizedError {
                status_code: 403,
                name: "unauthorized".into(),
                message: msg.clone(),
            },
            PaymentError::Gateway(GatewayError::Rejected {
                status_code,
                error_type,
                param,
                message,
            }) => NormalizedError {
                status_code: *status_code,
                name: match param {
                    Some(param) => format!("{error_type} {param}"),
                    None => error_type.clone(),
                },
                message: message.clone(),
            },
            other => NormalizedError::internal(other.to_string()),
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::Validation(_) => "The payment amount is not a valid number.",
            PaymentError::Authorization(_) => "Payment credentials are missing or invalid.",
            PaymentError::Gateway(GatewayError::Rejected { .. }) => "The payment was rejected.",
            _ => "An error occurred processing your payment.",
        }
    }
}

impl From<anyhow::Error> for PaymentError {
    fn from(err: anyhow::Error) -> Self {
        PaymentError::Other(err.to_string())
    }
}

/// Uniform error payload returned on every failure path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedError {
    pub status_code: u16,
    pub name: String,
    pub message: String,
}

impl NormalizedError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            name: "internal".into(),
            message: message.into(),
        }
    }

    /// Whether this is the generic internal bucket
    pub fn is_internal(&self) -> bool {
        self.status_code == 500 && self.name == "internal"
    }
}
