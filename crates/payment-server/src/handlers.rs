//! HTTP Handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::Instrument;

use payment_block::{GatewayError, PaymentError, PaymentIntentResult, PaymentRequest};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub type ErrorResponse = (StatusCode, Json<Value>);

/// Render a pipeline failure.
///
/// Validation and authorization failures carry `{message}`, gateway
/// rejections `{error: {name, message}}` and everything else
/// `{error: message}`.
pub fn error_response(err: &PaymentError, expose_internal: bool) -> ErrorResponse {
    let normalized = err.normalize();
    let status =
        StatusCode::from_u16(normalized.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = match err {
        PaymentError::Validation(_) | PaymentError::Authorization(_) => {
            json!({ "message": normalized.message })
        }
        PaymentError::Gateway(GatewayError::Rejected { .. }) => json!({
            "error": { "name": normalized.name, "message": normalized.message }
        }),
        _ if expose_internal => json!({ "error": normalized.message }),
        _ => json!({ "error": err.user_message() }),
    };

    (status, Json(body))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create a payment intent for a payment block
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<PaymentRequest>,
) -> Result<Json<PaymentIntentResult>, ErrorResponse> {
    let span = tracing::info_span!(
        "create_payment_intent",
        request_id = %uuid::Uuid::new_v4(),
        preview = payload.is_preview,
    );

    async move {
        state
            .pipeline
            .create_payment_intent(&payload)
            .await
            .map(Json)
            .map_err(|e| {
                if e.normalize().is_internal() {
                    tracing::error!("Payment intent error: {}", e);
                }
                error_response(&e, state.expose_internal_errors)
            })
    }
    .instrument(span)
    .await
}
