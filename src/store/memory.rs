//! In-memory implementation of the customer and message-log stores.
//!
//! A single mutex guards the whole map, so every operation (including the
//! policy-gated preference write) is serialized exactly like a row lock would
//! serialize it in Postgres. All data is lost when the store is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    classify_unconsumed_token, single_row, CompletionOutcome, CustomerStore, InsertOutcome,
    MessageLogStore, PreferenceOutcome, StoreError,
};
use crate::models::{
    Customer, MessageLog, NewCustomer, NewMessageLog, OnboardingDetails, OnboardingStatus,
    OrderTokenStatus, PreferenceChange,
};
use crate::services::preferences::{AntiFloodPolicy, PolicyDecision};

#[derive(Debug, Clone, Default)]
pub struct MemoryCustomerStore {
    customers: Arc<Mutex<HashMap<Uuid, Customer>>>,
}

impl MemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row as-is
    pub async fn put(&self, customer: Customer) {
        self.customers.lock().await.insert(customer.id, customer);
    }

    pub async fn len(&self) -> usize {
        self.customers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.customers.lock().await.is_empty()
    }

    async fn find_where<P>(&self, predicate: P) -> Result<Option<Customer>, StoreError>
    where
        P: Fn(&Customer) -> bool + Send,
    {
        let customers = self.customers.lock().await;
        let rows = customers.values().filter(|c| predicate(c)).cloned().collect();
        single_row(rows)
    }

    async fn update_where<F>(&self, id: Uuid, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Customer) + Send,
    {
        let mut customers = self.customers.lock().await;
        let customer = customers.get_mut(&id).ok_or(StoreError::NotFound)?;
        apply(customer);
        customer.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomerStore {
    async fn insert_if_absent(
        &self,
        new_customer: NewCustomer,
    ) -> Result<InsertOutcome, StoreError> {
        let mut customers = self.customers.lock().await;

        let duplicate = new_customer.order_id.is_some()
            && customers
                .values()
                .any(|c| c.order_id == new_customer.order_id);
        if duplicate {
            return Ok(InsertOutcome::Skipped);
        }

        if customers
            .values()
            .any(|c| c.order_token == new_customer.order_token)
        {
            return Err(StoreError::Database(
                "duplicate key value violates unique constraint on order_token".to_string(),
            ));
        }

        let customer = Customer::from_new(new_customer, Utc::now());
        customers.insert(customer.id, customer.clone());
        Ok(InsertOutcome::Created(customer))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        Ok(self.customers.lock().await.get(&id).cloned())
    }

    async fn find_by_order_token(&self, token: &str) -> Result<Option<Customer>, StoreError> {
        self.find_where(|c| c.order_token == token).await
    }

    async fn find_by_auth_identity(
        &self,
        identity: &str,
    ) -> Result<Option<Customer>, StoreError> {
        self.find_where(|c| c.auth_identity.as_deref() == Some(identity))
            .await
    }

    async fn complete_onboarding(
        &self,
        token: &str,
        details: OnboardingDetails,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, StoreError> {
        let mut customers = self.customers.lock().await;

        let matching: Vec<Uuid> = customers
            .values()
            .filter(|c| c.order_token == token)
            .map(|c| c.id)
            .collect();
        if matching.len() > 1 {
            return Err(StoreError::Ambiguous);
        }

        let Some(customer) = matching.first().and_then(|id| customers.get_mut(id)) else {
            return Ok(CompletionOutcome::UnknownToken);
        };

        if customer.order_token_status != OrderTokenStatus::New {
            return Ok(classify_unconsumed_token(Some(customer)));
        }

        let customer_id = customer.id;
        let identity_taken = customers.values().any(|c| {
            c.id != customer_id && c.auth_identity.as_deref() == Some(details.auth_identity.as_str())
        });
        if identity_taken {
            return Ok(CompletionOutcome::IdentityLinked);
        }
        let Some(customer) = customers.get_mut(&customer_id) else {
            return Ok(CompletionOutcome::UnknownToken);
        };

        customer.phone = Some(details.phone);
        customer.chat_id = Some(details.chat_id);
        customer.refresh_credential = Some(details.refresh_credential);
        customer.send_hour = details.send_hour;
        customer.timezone = details.timezone;
        customer.auth_identity = Some(details.auth_identity);
        customer.onboarding_status = OnboardingStatus::Complete;
        customer.order_token_status = OrderTokenStatus::Used;
        customer.onboarding_last_nudge_at = Some(now);
        customer.updated_at = now;

        Ok(CompletionOutcome::Completed(customer.clone()))
    }

    async fn apply_preferences(
        &self,
        id: Uuid,
        change: PreferenceChange,
        policy: &AntiFloodPolicy,
        now: DateTime<Utc>,
    ) -> Result<PreferenceOutcome, StoreError> {
        let mut customers = self.customers.lock().await;
        let customer = customers.get_mut(&id).ok_or(StoreError::NotFound)?;

        let effective_count = match policy.evaluate(customer, now) {
            PolicyDecision::Reject(reason) => return Ok(PreferenceOutcome::Rejected(reason)),
            PolicyDecision::Allow { effective_count } => effective_count,
        };

        customer.selected_resource_ids = change.selected_resource_ids;
        customer.send_hour = change.send_hour;
        customer.timezone = change.timezone;
        if let Some(display_name) = change.display_name {
            customer.user_name = display_name;
        }
        customer.prefs_last_updated_at = Some(now);
        customer.prefs_change_count_today = (effective_count + 1) as i32;
        customer.prefs_change_date = Some(now.date_naive());
        customer.updated_at = now;

        Ok(PreferenceOutcome::Applied(customer.clone()))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let mut rows: Vec<Customer> = self.customers.lock().await.values().cloned().collect();
        rows.sort_by_key(|c| c.created_at);
        Ok(rows)
    }

    async fn record_sent(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.update_where(id, |c| {
            c.last_sent_date = Some(now.date_naive());
            c.last_sent_at = Some(now);
        })
        .await
    }

    async fn record_nudge(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.update_where(id, |c| c.onboarding_last_nudge_at = Some(now))
            .await
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        self.update_where(id, |c| c.active = false).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryMessageLog {
    entries: Arc<Mutex<Vec<MessageLog>>>,
}

impl MemoryMessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<MessageLog> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl MessageLogStore for MemoryMessageLog {
    async fn append(&self, entry: NewMessageLog) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .push(MessageLog::from_new(entry, Utc::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_customer(order_id: i64, token: &str) -> NewCustomer {
        NewCustomer::from_order(
            order_id,
            "a@x.com".to_string(),
            "A".to_string(),
            token.to_string(),
        )
    }

    #[tokio::test]
    async fn test_insert_skips_duplicate_order() {
        let store = MemoryCustomerStore::new();

        let first = store.insert_if_absent(new_customer(7, "t1")).await.unwrap();
        assert!(matches!(first, InsertOutcome::Created(_)));

        let second = store.insert_if_absent(new_customer(7, "t2")).await.unwrap();
        assert_eq!(second, InsertOutcome::Skipped);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_lookups_return_none_when_absent() {
        let store = MemoryCustomerStore::new();

        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.find_by_order_token("missing").await.unwrap().is_none());
        assert!(store.find_by_auth_identity("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bookkeeping_on_missing_customer_is_not_found() {
        let store = MemoryCustomerStore::new();

        let result = store.record_sent(Uuid::new_v4(), Utc::now()).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_message_log_appends() {
        let log = MemoryMessageLog::new();
        let id = Uuid::new_v4();

        log.append(NewMessageLog::skipped(id, Utc::now(), "already_sent_today"))
            .await
            .unwrap();

        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].customer_id, id);
    }
}
