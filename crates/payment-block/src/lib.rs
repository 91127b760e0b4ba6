//! # payment-block
//!
//! Server-side handler for the chatbot "payment" block. Turns the block's
//! configuration into a Stripe payment intent the client can confirm.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Credential  │──▶│ Environment  │──▶│    Amount    │──▶│   Gateway    │
//! │   Resolver   │   │  (test/live) │   │  (minor ×100)│   │ (Stripe PI)  │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//!        │                  │                  │                  │
//!        └────────── PaymentError::normalize ◀─┴──────────────────┘
//! ```
//!
//! Collaborators are traits so each can be swapped out:
//!
//! - [`CredentialStore`] - where encrypted credential records live
//! - [`CredentialCipher`] - how records are decrypted
//! - [`VariableInterpolator`] - how `{{variables}}` are substituted
//! - [`PaymentGateway`] - who creates the payment intent
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use payment_block::*;
//!
//! let cipher = Arc::new(AesGcmCipher::from_env()?);
//! let store = Arc::new(MemoryCredentialStore::from_file("credentials.json")?);
//!
//! let pipeline = PaymentPipeline::new(
//!     CredentialResolver::new(store, cipher),
//!     Arc::new(TemplateInterpolator),
//!     Arc::new(StripeGateway::default()),
//!     CurrencySymbols::default(),
//! );
//!
//! let result = pipeline.create_payment_intent(&request).await?;
//! // Hand result.client_secret and result.public_key to Stripe.js
//! ```

mod amount;
mod cipher;
mod credentials;
mod currency;
mod error;
mod gateway;
mod pipeline;
mod variables;

pub use amount::{compute_amount, resolve_optional, to_minor_units};
pub use cipher::{AesGcmCipher, CredentialCipher, SealedPayload};
pub use credentials::{
    CredentialRecord, CredentialResolver, CredentialSet, CredentialStore, Environment,
    EnvironmentKeys, MemoryCredentialStore, SelectedKeys,
};
pub use currency::CurrencySymbols;
pub use error::{NormalizedError, PaymentError, Result};
pub use gateway::{
    CreatedPaymentIntent, GatewayError, PaymentGateway, PaymentIntentParams, StripeGateway,
};
pub use pipeline::{
    AdditionalInformation, PaymentInputOptions, PaymentIntentResult, PaymentPipeline,
    PaymentRequest, Stage,
};
pub use variables::{TemplateInterpolator, VariableBinding, VariableInterpolator};

// Re-exported so callers can build secret keys without depending on secrecy
pub use secrecy::{ExposeSecret, SecretString};
