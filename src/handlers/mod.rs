// HTTP handlers
// Webhook intake, onboarding, preferences and the scheduled trigger

pub mod cron;
pub mod onboarding;
pub mod preferences;
pub mod webhooks;

use crate::{app::AppState, utils::service_error::ServiceError};
use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post},
    Router,
};

// Shop webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/order", post(webhooks::order_created))
}

// Customer-facing routes (session required)
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/onboarding", post(onboarding::complete_onboarding))
        .route(
            "/preferences",
            get(preferences::get_preferences).post(preferences::save_preferences),
        )
}

// Scheduler trigger routes
pub fn cron_routes() -> Router<AppState> {
    Router::new().route("/run", post(cron::run_scheduler))
}

/// Malformed or incomplete JSON bodies are validation failures
pub(crate) fn invalid_body(rejection: JsonRejection) -> ServiceError {
    ServiceError::ValidationFailed(rejection.body_text())
}
