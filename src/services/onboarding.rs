// Onboarding completion: consumes the one-time order token

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::models::{Customer, OnboardingDetails, OnboardingRequest};
use crate::store::{CompletionOutcome, CustomerStore};
use crate::utils::audit_logger::{AuditAction, AuditLogger};
use crate::utils::service_error::ServiceError;

#[derive(Clone)]
pub struct OnboardingService {
    store: Arc<dyn CustomerStore>,
}

impl OnboardingService {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    /// Complete onboarding for the holder of `request.order_token`, linking it to `identity`.
    ///
    /// Only a token still in the `new` state is accepted. A consumed token fails with
    /// `TokenAlreadyUsed`; an unknown or expired token fails with `InvalidToken`.
    /// An identity already linked to another customer fails with `IdentityAlreadyLinked`.
    #[instrument(skip_all)]
    pub async fn complete(
        &self,
        request: OnboardingRequest,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Customer, ServiceError> {
        request.validate()?;

        let token = request.order_token.trim().to_string();
        let details = OnboardingDetails {
            phone: request.phone.trim().to_string(),
            chat_id: request.chat_id.trim().to_string(),
            refresh_credential: request.refresh_credential,
            send_hour: request.send_hour,
            timezone: request.timezone.trim().to_string(),
            auth_identity: identity.to_string(),
        };

        match self.store.complete_onboarding(&token, details, now).await? {
            CompletionOutcome::Completed(customer) => {
                info!("Onboarding completed for customer {}", customer.id);
                AuditLogger::log_customer_action(
                    AuditAction::OnboardingCompleted,
                    customer.id,
                    None,
                )
                .await;
                Ok(customer)
            },
            CompletionOutcome::TokenUsed => {
                warn!("Onboarding submitted with an already used token");
                AuditLogger::log_unresolved(
                    AuditAction::OnboardingRejected,
                    "token_already_used".to_string(),
                )
                .await;
                Err(ServiceError::TokenAlreadyUsed)
            },
            CompletionOutcome::UnknownToken | CompletionOutcome::TokenExpired => {
                warn!("Onboarding submitted with an invalid token");
                AuditLogger::log_unresolved(
                    AuditAction::OnboardingRejected,
                    "invalid_token".to_string(),
                )
                .await;
                Err(ServiceError::InvalidToken)
            },
            CompletionOutcome::IdentityLinked => {
                warn!("Onboarding submitted by an identity linked to another customer");
                AuditLogger::log_unresolved(
                    AuditAction::OnboardingRejected,
                    "identity_already_linked".to_string(),
                )
                .await;
                Err(ServiceError::IdentityAlreadyLinked)
            },
        }
    }
}
