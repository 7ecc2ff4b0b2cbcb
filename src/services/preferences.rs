// Preference anti-flood policy and the preferences write path
// A change is gated by a short cooldown and a daily quota. The daily counter is
// stored as a (date, count) pair and reset lazily when the date rolls over.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Customer, PreferenceChange, PreferencesRequest};
use crate::store::{CustomerStore, PreferenceOutcome};
use crate::utils::audit_logger::{AuditAction, AuditLogger};
use crate::utils::service_error::ServiceError;
use crate::utils::validation::{normalize_resource_ids, trim_optional_field};

// =============================================================================
// POLICY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooFrequent,
    DailyLimit,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::TooFrequent => "too_frequent",
            RejectReason::DailyLimit => "daily_limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// `effective_count` is the number of changes already made today
    Allow { effective_count: u32 },
    Reject(RejectReason),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow { .. })
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            PolicyDecision::Allow { .. } => None,
            PolicyDecision::Reject(reason) => Some(*reason),
        }
    }
}

/// Cooldown plus daily cap, evaluated against the customer's own stored state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntiFloodPolicy {
    pub cooldown: Duration,
    pub daily_limit: u32,
}

impl Default for AntiFloodPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(60),
            daily_limit: 20,
        }
    }
}

impl AntiFloodPolicy {
    pub fn new(cooldown: Duration, daily_limit: u32) -> Self {
        Self {
            cooldown,
            daily_limit,
        }
    }

    /// Decide whether `customer` may change preferences at `now`. Pure.
    ///
    /// The cooldown is checked first and applies regardless of the daily count.
    pub fn evaluate(&self, customer: &Customer, now: DateTime<Utc>) -> PolicyDecision {
        let effective_count = customer.effective_change_count(now.date_naive());

        if let Some(last) = customer.prefs_last_updated_at {
            if now - last < self.cooldown {
                return PolicyDecision::Reject(RejectReason::TooFrequent);
            }
        }

        if effective_count >= self.daily_limit {
            return PolicyDecision::Reject(RejectReason::DailyLimit);
        }

        PolicyDecision::Allow { effective_count }
    }

    pub fn remaining_today(&self, customer: &Customer, now: DateTime<Utc>) -> u32 {
        self.daily_limit
            .saturating_sub(customer.effective_change_count(now.date_naive()))
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Preferences as returned to the customer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreferencesView {
    pub calendar_ids: Vec<String>,
    pub send_hour: String,
    pub timezone: String,
    pub display_name: String,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub changes_remaining_today: u32,
}

#[derive(Clone)]
pub struct PreferencesService {
    store: Arc<dyn CustomerStore>,
    policy: AntiFloodPolicy,
}

impl PreferencesService {
    pub fn new(store: Arc<dyn CustomerStore>, policy: AntiFloodPolicy) -> Self {
        Self { store, policy }
    }

    pub fn view(&self, customer: &Customer, now: DateTime<Utc>) -> PreferencesView {
        PreferencesView {
            calendar_ids: customer.selected_resource_ids.clone(),
            send_hour: customer.send_hour.clone(),
            timezone: customer.timezone.clone(),
            display_name: customer.user_name.clone(),
            last_updated_at: customer.prefs_last_updated_at,
            changes_remaining_today: self.policy.remaining_today(customer, now),
        }
    }

    /// Validate and apply a preferences save for `customer_id`.
    ///
    /// The policy check and the write happen in one store operation.
    #[instrument(skip_all, fields(customer_id = %customer_id))]
    pub async fn save(
        &self,
        customer_id: Uuid,
        request: PreferencesRequest,
        now: DateTime<Utc>,
    ) -> Result<Customer, ServiceError> {
        request.validate()?;

        let change = PreferenceChange {
            selected_resource_ids: normalize_resource_ids(&request.calendar_ids),
            send_hour: request.send_hour,
            timezone: request.timezone.trim().to_string(),
            display_name: trim_optional_field(request.display_name.as_ref()),
        };

        match self
            .store
            .apply_preferences(customer_id, change, &self.policy, now)
            .await?
        {
            PreferenceOutcome::Applied(customer) => {
                info!(
                    "Preferences updated ({} changes today)",
                    customer.prefs_change_count_today
                );
                AuditLogger::log_customer_action(
                    AuditAction::PreferencesUpdated,
                    customer.id,
                    None,
                )
                .await;
                Ok(customer)
            },
            PreferenceOutcome::Rejected(reason) => {
                info!("Preferences change rejected: {}", reason.as_str());
                AuditLogger::log_customer_action(
                    AuditAction::PreferencesRejected,
                    customer_id,
                    Some(reason.as_str().to_string()),
                )
                .await;
                Err(ServiceError::RateLimited { reason })
            },
        }
    }
}
