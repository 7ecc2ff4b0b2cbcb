// Customer store contract
// The store is the single source of truth for customer state. Every write that
// depends on current state is a single serialized operation on the store.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Customer, NewCustomer, NewMessageLog, OnboardingDetails, PreferenceChange};
use crate::services::preferences::{AntiFloodPolicy, RejectReason};

pub use memory::{MemoryCustomerStore, MemoryMessageLog};
pub use postgres::{PgCustomerStore, PgMessageLog};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("More than one record matched")]
    Ambiguous,

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => StoreError::NotFound,
            _ => StoreError::Database(error.to_string()),
        }
    }
}

/// Result of a conflict-ignoring insert keyed on `order_id`
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Created(Customer),
    /// A customer for this order already existed; nothing was written
    Skipped,
}

/// Result of consuming an order token
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed(Customer),
    UnknownToken,
    TokenUsed,
    TokenExpired,
    /// The auth identity already belongs to another customer; nothing was written
    IdentityLinked,
}

/// Result of a policy-gated preference write
#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceOutcome {
    Applied(Customer),
    Rejected(RejectReason),
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Insert unless a customer with the same `order_id` exists
    async fn insert_if_absent(&self, new_customer: NewCustomer)
        -> Result<InsertOutcome, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError>;

    async fn find_by_order_token(&self, token: &str) -> Result<Option<Customer>, StoreError>;

    async fn find_by_auth_identity(&self, identity: &str)
        -> Result<Option<Customer>, StoreError>;

    /// Complete onboarding for the customer holding `token`, only while the token is `new`
    /// and the identity is not linked to a different customer
    async fn complete_onboarding(
        &self,
        token: &str,
        details: OnboardingDetails,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, StoreError>;

    /// Evaluate `policy` against the current row and write the change in the same
    /// critical section, so concurrent saves for one customer cannot both pass
    async fn apply_preferences(
        &self,
        id: Uuid,
        change: PreferenceChange,
        policy: &AntiFloodPolicy,
        now: DateTime<Utc>,
    ) -> Result<PreferenceOutcome, StoreError>;

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError>;

    async fn record_sent(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError>;

    async fn record_nudge(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError>;

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MessageLogStore: Send + Sync {
    async fn append(&self, entry: NewMessageLog) -> Result<(), StoreError>;
}

/// Zero rows is `None`, more than one is `Ambiguous`
pub(crate) fn single_row(mut rows: Vec<Customer>) -> Result<Option<Customer>, StoreError> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        _ => Err(StoreError::Ambiguous),
    }
}

/// Outcome for a token that did not match an updatable row
pub(crate) fn classify_unconsumed_token(existing: Option<&Customer>) -> CompletionOutcome {
    use crate::models::OrderTokenStatus;

    match existing.map(|c| c.order_token_status) {
        None => CompletionOutcome::UnknownToken,
        Some(OrderTokenStatus::Expired) => CompletionOutcome::TokenExpired,
        Some(OrderTokenStatus::Used) | Some(OrderTokenStatus::New) => CompletionOutcome::TokenUsed,
    }
}
