//! Application State

use payment_block::PaymentPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment block pipeline
    pub pipeline: PaymentPipeline,

    /// Send internal error details to clients
    pub expose_internal_errors: bool,
}
