// Onboarding handlers
// Completes onboarding for the session holder with the one-time order token

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::invalid_body;
use crate::{
    app::AppState,
    middleware::SessionIdentity,
    models::{Customer, OnboardingRequest, OnboardingStatus},
    utils::service_error::ServiceError,
};

// =============================================================================
// RESPONSE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub onboarding_status: OnboardingStatus,
    pub timezone: String,
    pub send_hour: String,
}

impl From<&Customer> for CustomerSummary {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            display_name: customer.user_name.clone(),
            email: customer.email.clone(),
            onboarding_status: customer.onboarding_status,
            timezone: customer.timezone.clone(),
            send_hour: customer.send_hour.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub success: bool,
    pub message: String,
    pub customer: CustomerSummary,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /api/onboarding - Complete onboarding and link the order to the session
pub async fn complete_onboarding(
    State(app_state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    payload: Result<Json<OnboardingRequest>, JsonRejection>,
) -> Result<Json<OnboardingResponse>, ServiceError> {
    let Json(payload) = payload.map_err(invalid_body)?;

    let customer = app_state
        .onboarding_service
        .complete(payload, &identity, Utc::now())
        .await?;

    Ok(Json(OnboardingResponse {
        success: true,
        message: "Onboarding completed".to_string(),
        customer: CustomerSummary::from(&customer),
    }))
}
