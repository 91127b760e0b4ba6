//! Payment Intent Pipeline
//!
//! ```text
//! Start ──▶ CredentialsResolved ──▶ EnvironmentSelected ──▶ AmountValidated ──▶ IntentCreated ──▶ Responded
//!   │               │                                              │
//!   └───────────────┴──────────────▶ Failed ◀──────────────────────┘
//! ```
//!
//! Missing credentials id, unknown or unusable credentials and non-numeric
//! amounts all exit before the gateway is contacted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::amount::{compute_amount, resolve_optional};
use crate::credentials::CredentialResolver;
use crate::currency::CurrencySymbols;
use crate::error::{PaymentError, Result};
use crate::gateway::{PaymentGateway, PaymentIntentParams};
use crate::variables::{VariableBinding, VariableInterpolator};

/// Pipeline stage, recorded on log events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Start,
    CredentialsResolved,
    EnvironmentSelected,
    AmountValidated,
    IntentCreated,
    Responded,
    Failed,
}

/// Optional payment details attached to the block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInformation {
    /// Receipt email expression
    #[serde(default)]
    pub email: Option<String>,

    /// Payment description expression
    #[serde(default)]
    pub description: Option<String>,
}

/// Payment block options as authored in the chatbot builder
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInputOptions {
    #[serde(default)]
    pub credentials_id: Option<String>,

    /// Amount expression, may reference variables
    #[serde(default)]
    pub amount: String,

    pub currency: String,

    #[serde(default)]
    pub additional_information: Option<AdditionalInformation>,
}

impl PaymentInputOptions {
    fn receipt_email(&self) -> Option<&str> {
        self.additional_information.as_ref()?.email.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.additional_information.as_ref()?.description.as_deref()
    }
}

/// Incoming request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub input_options: PaymentInputOptions,

    #[serde(default)]
    pub is_preview: bool,

    #[serde(default)]
    pub variables: Vec<VariableBinding>,
}

/// Data returned to the caller on success
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResult {
    pub client_secret: String,
    pub public_key: String,
    pub amount_label: String,
}

/// Runs a payment request end to end
#[derive(Clone)]
pub struct PaymentPipeline {
    resolver: CredentialResolver,
    interpolator: Arc<dyn VariableInterpolator>,
    gateway: Arc<dyn PaymentGateway>,
    symbols: Arc<CurrencySymbols>,
}

impl PaymentPipeline {
    pub fn new(
        resolver: CredentialResolver,
        interpolator: Arc<dyn VariableInterpolator>,
        gateway: Arc<dyn PaymentGateway>,
        symbols: CurrencySymbols,
    ) -> Self {
        Self {
            resolver,
            interpolator,
            gateway,
            symbols: Arc::new(symbols),
        }
    }

    /// Create a payment intent for `request`
    pub async fn create_payment_intent(&self, request: &PaymentRequest) -> Result<PaymentIntentResult> {
        let result = self.run(request).await;

        match &result {
            Ok(_) => tracing::info!(stage = ?Stage::Responded, "Payment intent created"),
            Err(e) => tracing::warn!(
                stage = ?Stage::Failed,
                status = e.status_code(),
                error = %e,
                "Payment intent failed"
            ),
        }

        result
    }

    async fn run(&self, request: &PaymentRequest) -> Result<PaymentIntentResult> {
        let options = &request.input_options;

        let credentials_id = options
            .credentials_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| PaymentError::Authorization("missing credentials id".into()))?;

        tracing::debug!(stage = ?Stage::Start, credentials_id, preview = request.is_preview);

        let credentials = self
            .resolver
            .resolve(credentials_id)
            .await?
            .ok_or_else(|| PaymentError::Authorization(format!("credentials {credentials_id} not found")))?;

        tracing::debug!(stage = ?Stage::CredentialsResolved, credentials_id);

        let keys = credentials.select(request.is_preview)?;

        tracing::debug!(stage = ?Stage::EnvironmentSelected, environment = keys.environment.as_str());

        let interpolator = self.interpolator.as_ref();
        let amount = compute_amount(interpolator, &request.variables, &options.amount)?;
        let receipt_email = resolve_optional(interpolator, &request.variables, options.receipt_email());
        let description = resolve_optional(interpolator, &request.variables, options.description());

        tracing::debug!(stage = ?Stage::AmountValidated, amount, currency = %options.currency);

        let params = PaymentIntentParams {
            amount,
            currency: options.currency.clone(),
            receipt_email,
            description,
        };
        let intent = self
            .gateway
            .create_payment_intent(&keys.secret_key, &params)
            .await?;

        tracing::debug!(stage = ?Stage::IntentCreated, payment_intent = %intent.id);

        Ok(PaymentIntentResult {
            client_secret: intent.client_secret,
            public_key: keys.public_key,
            amount_label: self.symbols.label(amount, &options.currency),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::json;

    use super::*;
    use crate::cipher::AesGcmCipher;
    use crate::credentials::{CredentialRecord, CredentialStore, MemoryCredentialStore};
    use crate::gateway::{CreatedPaymentIntent, GatewayError};
    use crate::variables::TemplateInterpolator;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    /// Records every call; answers with `reply`
    struct SpyGateway {
        calls: Mutex<Vec<(String, PaymentIntentParams)>>,
        reply: std::result::Result<CreatedPaymentIntent, GatewayError>,
    }

    impl SpyGateway {
        fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: Ok(CreatedPaymentIntent {
                    id: "pi_1".into(),
                    client_secret: "pi_1_secret_abc".into(),
                }),
            }
        }

        fn failing(err: GatewayError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: Err(err),
            }
        }

        fn calls(&self) -> Vec<(String, PaymentIntentParams)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for SpyGateway {
        async fn create_payment_intent(
            &self,
            secret_key: &SecretString,
            params: &PaymentIntentParams,
        ) -> std::result::Result<CreatedPaymentIntent, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((secret_key.expose_secret().to_string(), params.clone()));
            self.reply.clone()
        }
    }

    /// Counts lookups before delegating to a memory store
    struct CountingStore {
        inner: MemoryCredentialStore,
        gets: AtomicUsize,
    }

    impl CountingStore {
        fn gets(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CredentialStore for CountingStore {
        async fn get(&self, id: &str) -> Result<Option<CredentialRecord>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(id).await
        }
    }

    fn pipeline(credentials: serde_json::Value, gateway: Arc<SpyGateway>) -> PaymentPipeline {
        pipeline_with_store(credentials, gateway).0
    }

    fn pipeline_with_store(
        credentials: serde_json::Value,
        gateway: Arc<SpyGateway>,
    ) -> (PaymentPipeline, Arc<CountingStore>) {
        let cipher = Arc::new(AesGcmCipher::new(SECRET).unwrap());
        let sealed = cipher.seal(&credentials).unwrap();
        let store = Arc::new(CountingStore {
            inner: MemoryCredentialStore::with_records([CredentialRecord::new("cred_1", sealed)]),
            gets: AtomicUsize::new(0),
        });

        let pipeline = PaymentPipeline::new(
            CredentialResolver::new(store.clone(), cipher),
            Arc::new(TemplateInterpolator),
            gateway,
            CurrencySymbols::default(),
        );
        (pipeline, store)
    }

    fn both_environments() -> serde_json::Value {
        json!({
            "test": {"secretKey": "sk_test_1", "publicKey": "pk_test_1"},
            "live": {"secretKey": "sk_live_1", "publicKey": "pk_live_1"},
        })
    }

    fn request(amount: &str) -> PaymentRequest {
        PaymentRequest {
            input_options: PaymentInputOptions {
                credentials_id: Some("cred_1".into()),
                amount: amount.into(),
                currency: "USD".into(),
                additional_information: None,
            },
            is_preview: false,
            variables: vec![VariableBinding::new("Total", "19.999")],
        }
    }

    #[tokio::test]
    async fn test_successful_payment() {
        let gateway = Arc::new(SpyGateway::ok());
        let pipeline = pipeline(both_environments(), gateway.clone());

        let result = pipeline.create_payment_intent(&request("10")).await.unwrap();
        assert_eq!(result.client_secret, "pi_1_secret_abc");
        assert_eq!(result.public_key, "pk_live_1");
        assert_eq!(result.amount_label, "10$");

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sk_live_1");
        assert_eq!(calls[0].1.amount, 1000);
        assert_eq!(calls[0].1.currency, "USD");
    }

    #[tokio::test]
    async fn test_amount_from_variable_is_rounded() {
        let gateway = Arc::new(SpyGateway::ok());
        let pipeline = pipeline(both_environments(), gateway.clone());

        let result = pipeline.create_payment_intent(&request("{{Total}}")).await.unwrap();
        assert_eq!(gateway.calls()[0].1.amount, 2000);
        assert_eq!(result.amount_label, "20$");
    }

    #[tokio::test]
    async fn test_non_numeric_amount_never_calls_gateway() {
        let gateway = Arc::new(SpyGateway::ok());
        let pipeline = pipeline(both_environments(), gateway.clone());

        for amount in ["abc", "{{Unknown}}", "", "ten"] {
            let err = pipeline.create_payment_intent(&request(amount)).await.unwrap_err();
            assert!(matches!(err, PaymentError::Validation(_)), "amount {amount:?}");
            assert_eq!(err.status_code(), 400);
        }
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_id_is_unauthorized() {
        let gateway = Arc::new(SpyGateway::ok());
        let (pipeline, store) = pipeline_with_store(both_environments(), gateway.clone());

        for id in [None, Some(String::new()), Some("  ".to_string())] {
            let mut req = request("10");
            req.input_options.credentials_id = id;
            let err = pipeline.create_payment_intent(&req).await.unwrap_err();
            assert_eq!(err.status_code(), 403);
        }
        assert_eq!(store.gets(), 0);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_credentials_are_unauthorized() {
        let gateway = Arc::new(SpyGateway::ok());
        let (pipeline, store) = pipeline_with_store(both_environments(), gateway.clone());

        let mut req = request("10");
        req.input_options.credentials_id = Some("cred_other".into());
        let err = pipeline.create_payment_intent(&req).await.unwrap_err();
        assert!(matches!(err, PaymentError::Authorization(_)));
        assert_eq!(store.gets(), 1);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_live_secret_is_unauthorized() {
        let gateway = Arc::new(SpyGateway::ok());
        let pipeline = pipeline(json!({"live": {"publicKey": "pk_live_1"}}), gateway.clone());

        let err = pipeline.create_payment_intent(&request("10")).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_preview_uses_test_secret() {
        let gateway = Arc::new(SpyGateway::ok());
        let pipeline = pipeline(both_environments(), gateway.clone());

        let mut req = request("10");
        req.is_preview = true;
        let result = pipeline.create_payment_intent(&req).await.unwrap();
        assert_eq!(gateway.calls()[0].0, "sk_test_1");
        assert_eq!(result.public_key, "pk_test_1");
    }

    #[tokio::test]
    async fn test_preview_without_test_secret_uses_live() {
        let gateway = Arc::new(SpyGateway::ok());
        let pipeline = pipeline(
            json!({"live": {"secretKey": "sk_live_1", "publicKey": "pk_live_1"}}),
            gateway.clone(),
        );

        let mut req = request("10");
        req.is_preview = true;
        pipeline.create_payment_intent(&req).await.unwrap();
        assert_eq!(gateway.calls()[0].0, "sk_live_1");
    }

    #[tokio::test]
    async fn test_empty_receipt_email_is_absent() {
        let gateway = Arc::new(SpyGateway::ok());
        let pipeline = pipeline(both_environments(), gateway.clone());

        let mut req = request("10");
        req.input_options.additional_information = Some(AdditionalInformation {
            email: Some("{{Email}}".into()),
            description: Some("Order for {{Name}}".into()),
        });
        req.variables = vec![
            VariableBinding::new("Email", ""),
            VariableBinding::new("Name", "Ada"),
        ];

        pipeline.create_payment_intent(&req).await.unwrap();
        let params = &gateway.calls()[0].1;
        assert_eq!(params.receipt_email, None);
        assert_eq!(params.description.as_deref(), Some("Order for Ada"));
    }

    #[tokio::test]
    async fn test_receipt_email_is_interpolated() {
        let gateway = Arc::new(SpyGateway::ok());
        let pipeline = pipeline(both_environments(), gateway.clone());

        let mut req = request("10");
        req.input_options.additional_information = Some(AdditionalInformation {
            email: Some("{{Email}}".into()),
            description: None,
        });
        req.variables = vec![VariableBinding::new("Email", "ada@example.com")];

        pipeline.create_payment_intent(&req).await.unwrap();
        assert_eq!(
            gateway.calls()[0].1.receipt_email.as_deref(),
            Some("ada@example.com")
        );
    }

    #[tokio::test]
    async fn test_gateway_rejection_is_normalized() {
        let gateway = Arc::new(SpyGateway::failing(GatewayError::Rejected {
            status_code: 402,
            error_type: "card_error".into(),
            param: Some("cvc".into()),
            message: "Your card's security code is incorrect.".into(),
        }));
        let pipeline = pipeline(both_environments(), gateway.clone());

        let err = pipeline.create_payment_intent(&request("10")).await.unwrap_err();
        let normalized = err.normalize();
        assert_eq!(normalized.status_code, 402);
        assert_eq!(normalized.name, "card_error cvc");
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_gateway_transport_failure_is_internal() {
        let gateway = Arc::new(SpyGateway::failing(GatewayError::Transport("reset".into())));
        let pipeline = pipeline(both_environments(), gateway);

        let err = pipeline.create_payment_intent(&request("10")).await.unwrap_err();
        assert!(err.normalize().is_internal());
    }

    #[test]
    fn test_request_deserializes_from_camel_case() {
        let req: PaymentRequest = serde_json::from_value(json!({
            "inputOptions": {
                "credentialsId": "cred_1",
                "amount": "{{Total}}",
                "currency": "EUR",
                "additionalInformation": {"email": "{{Email}}"}
            },
            "isPreview": true,
            "variables": [{"name": "Total", "value": "5"}]
        }))
        .unwrap();

        assert_eq!(req.input_options.credentials_id.as_deref(), Some("cred_1"));
        assert_eq!(req.input_options.receipt_email(), Some("{{Email}}"));
        assert!(req.is_preview);
        assert_eq!(req.variables.len(), 1);
    }
}
