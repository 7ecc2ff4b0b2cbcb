// Error kinds surfaced by the customer services and their HTTP mapping
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::preferences::RejectReason;
use crate::store::StoreError;
use crate::utils::validation::format_validation_errors;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not found")]
    NotFound,

    #[error("Invalid order token")]
    InvalidToken,

    #[error("Order token already used")]
    TokenAlreadyUsed,

    #[error("This account is already linked to another order")]
    IdentityAlreadyLinked,

    #[error("Rate limited: {}", reason.as_str())]
    RateLimited { reason: RejectReason },

    #[error("Validation error: {0}")]
    ValidationFailed(String),

    #[error("Store error: {0}")]
    StoreFailure(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::InvalidToken => StatusCode::BAD_REQUEST,
            ServiceError::TokenAlreadyUsed => StatusCode::CONFLICT,
            ServiceError::IdentityAlreadyLinked => StatusCode::CONFLICT,
            ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound => "NOT_FOUND",
            ServiceError::InvalidToken => "INVALID_TOKEN",
            ServiceError::TokenAlreadyUsed => "TOKEN_ALREADY_USED",
            ServiceError::IdentityAlreadyLinked => "IDENTITY_ALREADY_LINKED",
            ServiceError::RateLimited { .. } => "RATE_LIMITED",
            ServiceError::ValidationFailed(_) => "VALIDATION_FAILED",
            ServiceError::StoreFailure(_) => "STORE_FAILURE",
            ServiceError::Unauthorized => "UNAUTHORIZED",
        }
    }

    /// Client-facing message. Store failures are not echoed back.
    fn public_message(&self) -> String {
        match self {
            ServiceError::StoreFailure(_) => "Internal server error".to_string(),
            ServiceError::RateLimited { reason: RejectReason::TooFrequent } => {
                "Preferences were changed less than a minute ago".to_string()
            },
            ServiceError::RateLimited { reason: RejectReason::DailyLimit } => {
                "Daily preference change limit reached".to_string()
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let ServiceError::StoreFailure(detail) = &self {
            tracing::error!("Store failure: {}", detail);
        }

        let mut error = json!({
            "code": self.error_code(),
            "message": self.public_message(),
        });
        if let ServiceError::RateLimited { reason } = &self {
            error["reason"] = json!(reason.as_str());
        }

        let body = Json(json!({
            "success": false,
            "error": error,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ServiceError::NotFound,
            other => ServiceError::StoreFailure(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(error: validator::ValidationErrors) -> Self {
        ServiceError::ValidationFailed(format_validation_errors(&error))
    }
}
