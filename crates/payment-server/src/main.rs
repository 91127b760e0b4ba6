//! payment-block HTTP Server
//!
//! Axum-based server exposing the payment block endpoint the chatbot
//! client calls before mounting Stripe Elements.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{routing::{get, post}, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payment_block::{
    AesGcmCipher, CredentialResolver, CurrencySymbols, MemoryCredentialStore, PaymentPipeline,
    StripeGateway, TemplateInterpolator,
};

use crate::config::ServerConfig;
use crate::handlers::{create_payment_intent, health_check};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    // Credential decryption
    let cipher = Arc::new(AesGcmCipher::new(config.encryption_secret.as_bytes())?);

    let store = match &config.credentials_file {
        Some(path) => {
            let store = MemoryCredentialStore::from_file(path)?;
            tracing::info!("✓ Loaded {} credential records from {}", store.len()?, path.display());
            store
        }
        None => {
            tracing::warn!("⚠ No CREDENTIALS_FILE set - every request will be forbidden");
            MemoryCredentialStore::new()
        }
    };

    let pipeline = PaymentPipeline::new(
        CredentialResolver::new(Arc::new(store), cipher),
        Arc::new(TemplateInterpolator),
        Arc::new(StripeGateway::new(config.gateway_timeout)),
        CurrencySymbols::default(),
    );

    if config.expose_internal_errors {
        tracing::warn!("⚠ Internal error details are sent to clients");
    }

    let state = AppState {
        pipeline,
        expose_internal_errors: config.expose_internal_errors,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/integrations/stripe/createPaymentIntent", post(create_payment_intent))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("🚀 payment-server running on http://{}", config.bind_addr);
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/integrations/stripe/createPaymentIntent");

    axum::serve(listener, app).await?;

    Ok(())
}
