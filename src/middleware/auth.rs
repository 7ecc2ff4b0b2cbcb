// Session extractors for customer-facing routes

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{app::AppState, models::Customer, utils::service_error::ServiceError};

/// Auth identity of the caller's session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionIdentity(pub String);

impl FromRequestParts<AppState> for SessionIdentity {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .session_service
            .identity_from_headers(&parts.headers)
            .map(SessionIdentity)
            .ok_or(ServiceError::Unauthorized)
    }
}

/// Customer linked to the caller's session.
/// No session and no linked customer are both rejected as unauthorized.
#[derive(Debug, Clone)]
pub struct AuthenticatedCustomer(pub Customer);

impl FromRequestParts<AppState> for AuthenticatedCustomer {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .session_service
            .current_customer(state.customer_store.as_ref(), &parts.headers)
            .await?
            .map(AuthenticatedCustomer)
            .ok_or(ServiceError::Unauthorized)
    }
}
