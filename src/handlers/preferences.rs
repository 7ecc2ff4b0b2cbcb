// Preferences handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use chrono::Utc;
use serde::Serialize;

use super::invalid_body;
use crate::{
    app::AppState,
    middleware::AuthenticatedCustomer,
    models::PreferencesRequest,
    services::PreferencesView,
    utils::service_error::ServiceError,
};

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub success: bool,
    pub preferences: PreferencesView,
}

/// GET /api/preferences
pub async fn get_preferences(
    State(app_state): State<AppState>,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
) -> Json<PreferencesResponse> {
    Json(PreferencesResponse {
        success: true,
        preferences: app_state.preferences_service.view(&customer, Utc::now()),
    })
}

/// POST /api/preferences - Save preferences, subject to the anti-flood policy
pub async fn save_preferences(
    State(app_state): State<AppState>,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    payload: Result<Json<PreferencesRequest>, JsonRejection>,
) -> Result<Json<PreferencesResponse>, ServiceError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let now = Utc::now();

    let updated = app_state
        .preferences_service
        .save(customer.id, payload, now)
        .await?;

    Ok(Json(PreferencesResponse {
        success: true,
        preferences: app_state.preferences_service.view(&updated, now),
    }))
}
