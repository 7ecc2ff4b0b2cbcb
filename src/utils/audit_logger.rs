// Audit trail for customer state transitions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    CustomerCreated,
    DuplicateOrderIgnored,
    OnboardingCompleted,
    OnboardingRejected,
    PreferencesUpdated,
    PreferencesRejected,
    CustomerDeactivated,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: AuditAction,
    pub customer_id: Option<Uuid>,
    pub resource_type: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct AuditLogger;

impl AuditLogger {
    /// Log an audit event for a customer record
    pub async fn log_customer_action(
        action: AuditAction,
        customer_id: Uuid,
        details: Option<String>,
    ) {
        Self::emit(AuditLog {
            id: Uuid::new_v4(),
            action,
            customer_id: Some(customer_id),
            resource_type: "customer".to_string(),
            details,
            timestamp: Utc::now(),
        });
    }

    /// Log an event that did not resolve to a customer (duplicate order, unknown token)
    pub async fn log_unresolved(action: AuditAction, details: String) {
        Self::emit(AuditLog {
            id: Uuid::new_v4(),
            action,
            customer_id: None,
            resource_type: "customer".to_string(),
            details: Some(details),
            timestamp: Utc::now(),
        });
    }

    fn emit(audit_log: AuditLog) {
        let json_log = serde_json::to_string(&audit_log).unwrap_or_else(|e| {
            warn!("Failed to serialize audit log: {}", e);
            format!("{:?}", audit_log)
        });

        info!(target: "audit", "{}", json_log);
    }
}
