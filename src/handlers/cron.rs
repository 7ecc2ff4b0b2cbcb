// Scheduled trigger
// An external cron calls this with the shared secret; the body is empty

use axum::{extract::State, http::HeaderMap, response::Json};
use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{
    app::AppState,
    services::{scheduler::RunReport, session::bearer_token},
    utils::service_error::ServiceError,
};

/// POST /api/cron/run - Run reminders and onboarding nudges once
pub async fn run_scheduler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RunReport>, ServiceError> {
    let authorized = bearer_token(&headers)
        .map(|token| bool::from(token.as_bytes().ct_eq(app_state.cron_secret.as_bytes())))
        .unwrap_or(false);

    if !authorized {
        warn!("Rejected scheduler trigger with missing or wrong secret");
        return Err(ServiceError::Unauthorized);
    }

    let report = app_state.scheduler.run_once(Utc::now()).await?;
    Ok(Json(report))
}
