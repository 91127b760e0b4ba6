//! Payment Gateway
//!
//! [`PaymentGateway`] is the seam to the payment provider. Implementations
//! report failures as a closed [`GatewayError`] so callers can tell a
//! structured provider rejection apart from everything else.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use stripe::Currency;
use thiserror::Error;

/// Gateway failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Structured rejection carrying the provider's own status and type
    #[error("{error_type} ({status_code}): {message}")]
    Rejected {
        status_code: u16,
        error_type: String,
        param: Option<String>,
        message: String,
    },

    /// Request never produced a structured answer
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// Request did not complete in time
    #[error("Gateway timed out after {0:?}")]
    Timeout(Duration),

    /// Request was rejected locally before being sent
    #[error("Invalid gateway request: {0}")]
    InvalidRequest(String),

    /// Answer was missing data the pipeline needs
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Parameters for a payment intent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentParams {
    /// Amount in minor units
    pub amount: i64,

    /// ISO currency code
    pub currency: String,

    #[serde(default)]
    pub receipt_email: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Payment intent created by the gateway
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatedPaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Payment gateway client
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent with automatic payment methods enabled
    async fn create_payment_intent(
        &self,
        secret_key: &SecretString,
        params: &PaymentIntentParams,
    ) -> Result<CreatedPaymentIntent, GatewayError>;
}

/// Default Stripe API base URL
pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe gateway
///
/// Talks to the PaymentIntents endpoint directly so that a rejection's
/// `param` survives into [`GatewayError::Rejected`]. The secret key is
/// attached per call, so no credentials are held between requests.
#[derive(Clone, Debug)]
pub struct StripeGateway {
    http_client: reqwest::Client,
    api_base_url: String,
    timeout: Duration,
}

impl Default for StripeGateway {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl StripeGateway {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base_url: STRIPE_API_BASE.to_string(),
            timeout,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(
        &self,
        secret_key: &SecretString,
        form: &[(&str, String)],
    ) -> Result<CreatedPaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(secret_key.expose_secret())
            .form(form)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection_from_body(status.as_u16(), &body));
        }

        let intent: IntentBody = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("unreadable payment intent: {e}")))?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::InvalidResponse("no client secret returned".into()))?;

        Ok(CreatedPaymentIntent {
            id: intent.id,
            client_secret,
        })
    }
}

/// Form fields for `POST /v1/payment_intents`
fn intent_form(
    amount: i64,
    currency: Currency,
    params: &PaymentIntentParams,
) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("amount", amount.to_string()),
        ("currency", currency.to_string()),
        ("automatic_payment_methods[enabled]", "true".to_string()),
    ];

    if let Some(email) = &params.receipt_email {
        form.push(("receipt_email", email.clone()));
    }
    if let Some(description) = &params.description {
        form.push(("description", description.clone()));
    }

    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        secret_key: &SecretString,
        params: &PaymentIntentParams,
    ) -> Result<CreatedPaymentIntent, GatewayError> {
        let currency: Currency = params
            .currency
            .to_lowercase()
            .parse()
            .map_err(|_| {
                GatewayError::InvalidRequest(format!("unsupported currency {}", params.currency))
            })?;

        let form = intent_form(params.amount, currency, params);

        tokio::time::timeout(self.timeout, self.send(secret_key, &form))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))?
    }
}

#[derive(Deserialize)]
struct IntentBody {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

// Stripe error envelope: {"error": {"type", "param", "message", "code", ...}}
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a non-2xx Stripe answer to a [`GatewayError`].
///
/// Bodies carrying Stripe's error envelope become [`GatewayError::Rejected`]
/// with the HTTP status, type and param. Anything else is a transport error.
pub fn rejection_from_body(status_code: u16, body: &str) -> GatewayError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => GatewayError::Rejected {
            status_code,
            error_type: error.error_type,
            param: error.param.filter(|p| !p.is_empty()),
            message: error.message.unwrap_or_default(),
        },
        Err(_) => GatewayError::Transport(format!("unexpected {status_code} response from Stripe")),
    }
}
