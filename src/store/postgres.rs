// PostgreSQL customer store (diesel-async over the bb8 pool)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel_async::{
    pooled_connection::AsyncDieselConnectionManager, scoped_futures::ScopedFutureExt,
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    classify_unconsumed_token, single_row, CompletionOutcome, CustomerStore, InsertOutcome,
    MessageLogStore, PreferenceOutcome, StoreError,
};
use crate::{
    db::DieselPool,
    models::{
        Customer, NewCustomer, NewMessageLog, OnboardingDetails, OnboardingStatus,
        OrderTokenStatus, PreferenceChange,
    },
    schema::{customers, message_log},
    services::preferences::{AntiFloodPolicy, PolicyDecision},
};

// Default name of the UNIQUE constraint on customers.auth_identity
const AUTH_IDENTITY_CONSTRAINT: &str = "customers_auth_identity_key";

type PgConn<'a> = bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Debug, AsChangeset)]
#[diesel(table_name = customers)]
struct PreferencesChangeset {
    selected_resource_ids: Vec<String>,
    send_hour: String,
    timezone: String,
    user_name: Option<String>,
    prefs_last_updated_at: Option<DateTime<Utc>>,
    prefs_change_count_today: i32,
    prefs_change_date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct PgCustomerStore {
    pool: DieselPool,
}

impl PgCustomerStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<PgConn<'_>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(format!("Database connection failed: {}", e)))
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    #[instrument(skip(self, new_customer), fields(order_id = ?new_customer.order_id))]
    async fn insert_if_absent(
        &self,
        new_customer: NewCustomer,
    ) -> Result<InsertOutcome, StoreError> {
        let mut conn = self.conn().await?;

        // ON CONFLICT (order_id) DO NOTHING returns no row for a duplicate
        let inserted = diesel::insert_into(customers::table)
            .values(&new_customer)
            .on_conflict(customers::order_id)
            .do_nothing()
            .returning(Customer::as_returning())
            .get_result::<Customer>(&mut conn)
            .await
            .optional()?;

        Ok(match inserted {
            Some(customer) => InsertOutcome::Created(customer),
            None => InsertOutcome::Skipped,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = customers::table
            .filter(customers::id.eq(id))
            .select(Customer::as_select())
            .limit(2)
            .load::<Customer>(&mut conn)
            .await?;

        single_row(rows)
    }

    async fn find_by_order_token(&self, token: &str) -> Result<Option<Customer>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = customers::table
            .filter(customers::order_token.eq(token))
            .select(Customer::as_select())
            .limit(2)
            .load::<Customer>(&mut conn)
            .await?;

        single_row(rows)
    }

    async fn find_by_auth_identity(
        &self,
        identity: &str,
    ) -> Result<Option<Customer>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = customers::table
            .filter(customers::auth_identity.eq(identity))
            .select(Customer::as_select())
            .limit(2)
            .load::<Customer>(&mut conn)
            .await?;

        single_row(rows)
    }

    #[instrument(skip(self, token, details))]
    async fn complete_onboarding(
        &self,
        token: &str,
        details: OnboardingDetails,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, StoreError> {
        let mut conn = self.conn().await?;

        let completed = diesel::update(
            customers::table
                .filter(customers::order_token.eq(token))
                .filter(customers::order_token_status.eq(OrderTokenStatus::New)),
        )
        .set((
            customers::phone.eq(Some(details.phone)),
            customers::chat_id.eq(Some(details.chat_id)),
            customers::refresh_credential.eq(Some(details.refresh_credential)),
            customers::send_hour.eq(details.send_hour),
            customers::timezone.eq(details.timezone),
            customers::auth_identity.eq(Some(details.auth_identity)),
            customers::onboarding_status.eq(OnboardingStatus::Complete),
            customers::order_token_status.eq(OrderTokenStatus::Used),
            customers::onboarding_last_nudge_at.eq(Some(now)),
        ))
        .returning(Customer::as_returning())
        .get_result::<Customer>(&mut conn)
        .await;

        let completed = match completed {
            Ok(customer) => Some(customer),
            Err(diesel::result::Error::NotFound) => None,
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
                if info.constraint_name() == Some(AUTH_IDENTITY_CONSTRAINT) =>
            {
                return Ok(CompletionOutcome::IdentityLinked);
            },
            Err(e) => return Err(e.into()),
        };

        if let Some(customer) = completed {
            return Ok(CompletionOutcome::Completed(customer));
        }

        drop(conn);
        let existing = self.find_by_order_token(token).await?;
        debug!(
            "Order token did not match an unconsumed customer (exists: {})",
            existing.is_some()
        );
        Ok(classify_unconsumed_token(existing.as_ref()))
    }

    #[instrument(skip(self, change, policy))]
    async fn apply_preferences(
        &self,
        id: Uuid,
        change: PreferenceChange,
        policy: &AntiFloodPolicy,
        now: DateTime<Utc>,
    ) -> Result<PreferenceOutcome, StoreError> {
        let policy = *policy;
        let mut conn = self.conn().await?;

        conn.transaction::<PreferenceOutcome, StoreError, _>(|conn| {
            async move {
                // Row lock serializes concurrent saves for the same customer
                let customer = customers::table
                    .filter(customers::id.eq(id))
                    .select(Customer::as_select())
                    .for_update()
                    .get_result::<Customer>(conn)
                    .await?;

                let effective_count = match policy.evaluate(&customer, now) {
                    PolicyDecision::Reject(reason) => {
                        return Ok(PreferenceOutcome::Rejected(reason));
                    },
                    PolicyDecision::Allow { effective_count } => effective_count,
                };

                let changeset = PreferencesChangeset {
                    selected_resource_ids: change.selected_resource_ids,
                    send_hour: change.send_hour,
                    timezone: change.timezone,
                    user_name: change.display_name,
                    prefs_last_updated_at: Some(now),
                    prefs_change_count_today: (effective_count + 1) as i32,
                    prefs_change_date: Some(now.date_naive()),
                };

                let updated = diesel::update(customers::table.filter(customers::id.eq(id)))
                    .set(&changeset)
                    .returning(Customer::as_returning())
                    .get_result::<Customer>(conn)
                    .await?;

                Ok(PreferenceOutcome::Applied(updated))
            }
            .scope_boxed()
        })
        .await
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = customers::table
            .select(Customer::as_select())
            .order(customers::created_at.asc())
            .load::<Customer>(&mut conn)
            .await?;

        Ok(rows)
    }

    async fn record_sent(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;

        let updated = diesel::update(customers::table.filter(customers::id.eq(id)))
            .set((
                customers::last_sent_date.eq(Some(now.date_naive())),
                customers::last_sent_at.eq(Some(now)),
            ))
            .execute(&mut conn)
            .await?;

        expect_one(updated)
    }

    async fn record_nudge(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;

        let updated = diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::onboarding_last_nudge_at.eq(Some(now)))
            .execute(&mut conn)
            .await?;

        expect_one(updated)
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;

        let updated = diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::active.eq(false))
            .execute(&mut conn)
            .await?;

        expect_one(updated)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let conn = self.conn().await?;
        drop(conn);
        Ok(())
    }
}

fn expect_one(updated: usize) -> Result<(), StoreError> {
    if updated == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMessageLog {
    pool: DieselPool,
}

impl PgMessageLog {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageLogStore for PgMessageLog {
    async fn append(&self, entry: NewMessageLog) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(format!("Database connection failed: {}", e)))?;

        diesel::insert_into(message_log::table)
            .values(&entry)
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
