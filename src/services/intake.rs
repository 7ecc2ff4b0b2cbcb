// Order intake: one customer per order, duplicate deliveries are no-ops

use base64::prelude::*;
use rand::RngCore;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::models::{Customer, NewCustomer, OrderWebhookPayload};
use crate::store::{CustomerStore, InsertOutcome};
use crate::utils::audit_logger::{AuditAction, AuditLogger};
use crate::utils::service_error::ServiceError;

/// What intake did with an order event
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    Created(Customer),
    /// A customer for this order already exists. The existing record is not returned.
    Duplicate,
}

impl IntakeOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, IntakeOutcome::Created(_))
    }
}

#[derive(Clone)]
pub struct IntakeService {
    store: Arc<dyn CustomerStore>,
}

impl IntakeService {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    /// One-time onboarding token: 32 random bytes, base64url without padding
    pub fn generate_order_token() -> String {
        let mut token_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token_bytes);
        BASE64_URL_SAFE_NO_PAD.encode(token_bytes)
    }

    #[instrument(skip_all, fields(order_id = payload.order_id))]
    pub async fn ingest_order(
        &self,
        payload: OrderWebhookPayload,
    ) -> Result<IntakeOutcome, ServiceError> {
        payload.validate()?;

        let new_customer = NewCustomer::from_order(
            payload.order_id,
            payload.customer_email.trim().to_string(),
            payload.customer_name.trim().to_string(),
            Self::generate_order_token(),
        );

        match self.store.insert_if_absent(new_customer).await? {
            InsertOutcome::Created(customer) => {
                info!("Customer created for order {}", payload.order_id);
                AuditLogger::log_customer_action(
                    AuditAction::CustomerCreated,
                    customer.id,
                    Some(format!("order_id={}", payload.order_id)),
                )
                .await;
                Ok(IntakeOutcome::Created(customer))
            },
            InsertOutcome::Skipped => {
                info!("Order {} already has a customer, ignoring", payload.order_id);
                AuditLogger::log_unresolved(
                    AuditAction::DuplicateOrderIgnored,
                    format!("order_id={}", payload.order_id),
                )
                .await;
                Ok(IntakeOutcome::Duplicate)
            },
        }
    }
}
