// Due selection and the scheduled delivery run
//
// Selection is pure. The run walks the whole customer set once, isolating
// failures per customer, and writes bookkeeping and message-log entries as it goes.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::models::{Customer, NewMessageLog};
use crate::services::notifier::Notifier;
use crate::store::{CustomerStore, MessageLogStore};
use crate::utils::audit_logger::{AuditAction, AuditLogger};
use crate::utils::service_error::ServiceError;

pub const DEFAULT_NUDGE_INTERVAL_HOURS: i64 = 48;

/// Customers eligible for today's reminder, in store order
pub fn select_reminder_targets(customers: &[Customer]) -> Vec<&Customer> {
    customers
        .iter()
        .filter(|c| c.is_reminder_eligible())
        .collect()
}

/// Pending customers with an email and no nudge within `interval`
pub fn select_nudge_targets(
    customers: &[Customer],
    now: DateTime<Utc>,
    interval: Duration,
) -> Vec<&Customer> {
    customers
        .iter()
        .filter(|c| c.is_nudge_due(now, interval))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderStats {
    pub sent: u32,
    pub failed: u32,
    pub skipped: u32,
    pub deactivated: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NudgeStats {
    pub sent: u32,
    pub failed: u32,
}

/// Aggregate outcome of one run. Individual failures never abort the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub reminders: ReminderStats,
    pub nudges: NudgeStats,
    pub log_failures: u32,
    /// Failed writes of last-sent, last-nudge or deactivation state
    pub bookkeeping_failures: u32,
}

#[derive(Clone)]
pub struct ReminderScheduler {
    store: Arc<dyn CustomerStore>,
    message_log: Arc<dyn MessageLogStore>,
    notifier: Arc<dyn Notifier>,
    nudge_interval: Duration,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn CustomerStore>,
        message_log: Arc<dyn MessageLogStore>,
        notifier: Arc<dyn Notifier>,
        nudge_interval: Duration,
    ) -> Self {
        Self {
            store,
            message_log,
            notifier,
            nudge_interval,
        }
    }

    /// Run reminders then nudges over the current customer set.
    ///
    /// Only loading the customer set can fail the run as a whole.
    #[instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport, ServiceError> {
        let customers = self.store.list_customers().await?;
        let mut report = RunReport::default();

        for customer in select_reminder_targets(&customers) {
            self.deliver_reminder(customer, now, &mut report).await;
        }

        for customer in select_nudge_targets(&customers, now, self.nudge_interval) {
            self.deliver_nudge(customer, now, &mut report).await;
        }

        info!(
            "Scheduler run finished: reminders sent={} failed={} skipped={} deactivated={}, nudges sent={} failed={}, log failures={}, bookkeeping failures={}",
            report.reminders.sent,
            report.reminders.failed,
            report.reminders.skipped,
            report.reminders.deactivated,
            report.nudges.sent,
            report.nudges.failed,
            report.log_failures,
            report.bookkeeping_failures
        );

        Ok(report)
    }

    async fn deliver_reminder(
        &self,
        customer: &Customer,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) {
        if customer.was_sent_on(now.date_naive()) {
            report.reminders.skipped += 1;
            self.record(
                NewMessageLog::skipped(customer.id, now, "already sent today"),
                report,
            )
            .await;
            return;
        }

        match self.notifier.send_reminder(customer).await {
            Ok(receipt) => {
                report.reminders.sent += 1;
                if let Err(e) = self.store.record_sent(customer.id, now).await {
                    report.bookkeeping_failures += 1;
                    error!("Failed to record send for customer {}: {}", customer.id, e);
                }
                self.record(
                    NewMessageLog::sent(
                        customer.id,
                        now,
                        receipt.scenario,
                        receipt.events_count,
                        receipt.preview,
                    ),
                    report,
                )
                .await;
            },
            Err(e) => {
                report.reminders.failed += 1;
                warn!("Reminder for customer {} failed: {}", customer.id, e);
                self.record(
                    NewMessageLog::failed(customer.id, now, e.to_string()),
                    report,
                )
                .await;

                if e.is_terminal() {
                    self.deactivate(customer, report).await;
                }
            },
        }
    }

    async fn deliver_nudge(&self, customer: &Customer, now: DateTime<Utc>, report: &mut RunReport) {
        match self.notifier.send_onboarding_nudge(customer).await {
            Ok(()) => {
                report.nudges.sent += 1;
                if let Err(e) = self.store.record_nudge(customer.id, now).await {
                    // The customer stays due and is nudged again next run
                    report.bookkeeping_failures += 1;
                    error!("Failed to record nudge for customer {}: {}", customer.id, e);
                }
            },
            Err(e) => {
                report.nudges.failed += 1;
                warn!("Onboarding nudge for customer {} failed: {}", customer.id, e);
            },
        }
    }

    async fn deactivate(&self, customer: &Customer, report: &mut RunReport) {
        match self.store.deactivate(customer.id).await {
            Ok(()) => {
                report.reminders.deactivated += 1;
                info!("Customer {} deactivated after terminal rejection", customer.id);
                AuditLogger::log_customer_action(
                    AuditAction::CustomerDeactivated,
                    customer.id,
                    Some("terminal delivery rejection".to_string()),
                )
                .await;
            },
            Err(e) => {
                report.bookkeeping_failures += 1;
                error!("Failed to deactivate customer {}: {}", customer.id, e);
            },
        }
    }

    /// Message-log writes are diagnostic; a failure is counted and logged, never raised
    async fn record(&self, entry: NewMessageLog, report: &mut RunReport) {
        let customer_id = entry.customer_id;
        if let Err(e) = self.message_log.append(entry).await {
            report.log_failures += 1;
            error!(
                "Failed to write message log for customer {}: {}",
                customer_id, e
            );
        }
    }
}
