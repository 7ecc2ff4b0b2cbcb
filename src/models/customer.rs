// Customer Database Model
// Order linkage, onboarding state, preferences and delivery bookkeeping

use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::customers;

/// Lifecycle of the one-time order token
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "snake_case")]
pub enum OrderTokenStatus {
    New,
    Used,
    Expired,
}

impl OrderTokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderTokenStatus::New => "new",
            OrderTokenStatus::Used => "used",
            OrderTokenStatus::Expired => "expired",
        }
    }
}

impl FromStr for OrderTokenStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderTokenStatus::New),
            "used" => Ok(OrderTokenStatus::Used),
            "expired" => Ok(OrderTokenStatus::Expired),
            _ => Err(format!("Invalid order token status: {}", s)),
        }
    }
}

/// Onboarding progress of a customer
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    Pending,
    Complete,
}

impl OnboardingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStatus::Pending => "pending",
            OnboardingStatus::Complete => "complete",
        }
    }
}

impl FromStr for OnboardingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OnboardingStatus::Pending),
            "complete" => Ok(OnboardingStatus::Complete),
            _ => Err(format!("Invalid onboarding status: {}", s)),
        }
    }
}

macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for $ty
        where
            DB: diesel::backend::Backend,
            String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
        {
            fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
                let value = String::from_sql(bytes)?;
                <$ty as std::str::FromStr>::from_str(&value).map_err(|e| e.into())
            }
        }

        impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for $ty
        where
            DB: diesel::backend::Backend,
            str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
        {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, DB>,
            ) -> diesel::serialize::Result {
                self.as_str().to_sql(out)
            }
        }
    };
}

pub(crate) use text_enum_sql;

text_enum_sql!(OrderTokenStatus);
text_enum_sql!(OnboardingStatus);

/// Customer database model - queryable from database
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Customer {
    pub id: Uuid,
    pub auth_identity: Option<String>,
    pub user_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub chat_id: Option<String>,
    pub refresh_credential: Option<String>,
    pub selected_resource_ids: Vec<String>,
    pub timezone: String,
    pub send_hour: String,
    pub prefs_last_updated_at: Option<DateTime<Utc>>,
    pub prefs_change_count_today: i32,
    pub prefs_change_date: Option<NaiveDate>,
    pub order_id: Option<i64>,
    pub order_token: String,
    pub order_token_status: OrderTokenStatus,
    pub onboarding_status: OnboardingStatus,
    pub onboarding_last_nudge_at: Option<DateTime<Utc>>,
    pub last_sent_date: Option<NaiveDate>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New customer for insertion, built from an order event
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub user_name: String,
    pub email: String,
    pub order_id: Option<i64>,
    pub order_token: String,
    pub order_token_status: OrderTokenStatus,
    pub onboarding_status: OnboardingStatus,
    pub active: bool,
}

impl NewCustomer {
    pub fn from_order(order_id: i64, email: String, user_name: String, order_token: String) -> Self {
        Self {
            user_name,
            email,
            order_id: Some(order_id),
            order_token,
            order_token_status: OrderTokenStatus::New,
            onboarding_status: OnboardingStatus::Pending,
            active: true,
        }
    }
}

/// Fields written when a customer completes onboarding
#[derive(Debug, Clone)]
pub struct OnboardingDetails {
    pub phone: String,
    pub chat_id: String,
    pub refresh_credential: String,
    pub send_hour: String,
    pub timezone: String,
    pub auth_identity: String,
}

/// A requested preference change, applied only if the anti-flood policy allows it
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceChange {
    pub selected_resource_ids: Vec<String>,
    pub send_hour: String,
    pub timezone: String,
    /// Replaces `user_name` when present
    pub display_name: Option<String>,
}

impl Customer {
    /// Materialize a freshly inserted row with column defaults applied
    pub fn from_new(new_customer: NewCustomer, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            auth_identity: None,
            user_name: new_customer.user_name,
            email: new_customer.email,
            phone: None,
            chat_id: None,
            refresh_credential: None,
            selected_resource_ids: Vec::new(),
            timezone: "UTC".to_string(),
            send_hour: "07:00".to_string(),
            prefs_last_updated_at: None,
            prefs_change_count_today: 0,
            prefs_change_date: None,
            order_id: new_customer.order_id,
            order_token: new_customer.order_token,
            order_token_status: new_customer.order_token_status,
            onboarding_status: new_customer.onboarding_status,
            onboarding_last_nudge_at: None,
            last_sent_date: None,
            last_sent_at: None,
            active: new_customer.active,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Preference changes made on `today`. A stored count from another day counts as zero.
    pub fn effective_change_count(&self, today: NaiveDate) -> u32 {
        match self.prefs_change_date {
            Some(date) if date == today => self.prefs_change_count_today.max(0) as u32,
            _ => 0,
        }
    }

    pub fn is_onboarding_complete(&self) -> bool {
        self.onboarding_status == OnboardingStatus::Complete
    }

    /// Active, onboarded, and reachable through both the calendar credential and chat
    pub fn is_reminder_eligible(&self) -> bool {
        self.active
            && self.is_onboarding_complete()
            && self.refresh_credential.is_some()
            && self.chat_id.is_some()
    }

    /// Pending with an email on file and no nudge within `interval` of `now`
    pub fn is_nudge_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        if self.is_onboarding_complete() || self.email.is_empty() {
            return false;
        }

        match self.onboarding_last_nudge_at {
            None => true,
            Some(last) => last < now - interval,
        }
    }

    pub fn was_sent_on(&self, day: NaiveDate) -> bool {
        self.last_sent_date == Some(day)
    }
}
