use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::customer::text_enum_sql;
use crate::schema::message_log;

/// Shape of the day a reminder described
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
pub enum MessageScenario {
    Empty,
    Normal,
    Overlap,
    FreeBlock,
}

impl MessageScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageScenario::Empty => "empty",
            MessageScenario::Normal => "normal",
            MessageScenario::Overlap => "overlap",
            MessageScenario::FreeBlock => "free_block",
        }
    }
}

impl FromStr for MessageScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(MessageScenario::Empty),
            "normal" => Ok(MessageScenario::Normal),
            "overlap" => Ok(MessageScenario::Overlap),
            "free_block" => Ok(MessageScenario::FreeBlock),
            _ => Err(format!("Invalid message scenario: {}", s)),
        }
    }
}

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
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Skipped => "skipped",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            "skipped" => Ok(DeliveryStatus::Skipped),
            _ => Err(format!("Invalid delivery status: {}", s)),
        }
    }
}

text_enum_sql!(MessageScenario);
text_enum_sql!(DeliveryStatus);

/// One delivery attempt. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = message_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageLog {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub scenario: Option<MessageScenario>,
    pub events_count: Option<i32>,
    pub message_preview: Option<String>,
    pub delivery_status: DeliveryStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = message_log)]
pub struct NewMessageLog {
    pub customer_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub scenario: Option<MessageScenario>,
    pub events_count: Option<i32>,
    pub message_preview: Option<String>,
    pub delivery_status: DeliveryStatus,
    pub error_message: Option<String>,
}

impl NewMessageLog {
    pub fn sent(
        customer_id: Uuid,
        sent_at: DateTime<Utc>,
        scenario: Option<MessageScenario>,
        events_count: Option<i32>,
        message_preview: Option<String>,
    ) -> Self {
        Self {
            customer_id,
            sent_at,
            scenario,
            events_count,
            message_preview,
            delivery_status: DeliveryStatus::Sent,
            error_message: None,
        }
    }

    pub fn failed(customer_id: Uuid, sent_at: DateTime<Utc>, error_message: String) -> Self {
        Self {
            customer_id,
            sent_at,
            scenario: None,
            events_count: None,
            message_preview: None,
            delivery_status: DeliveryStatus::Failed,
            error_message: Some(error_message),
        }
    }

    pub fn skipped(customer_id: Uuid, sent_at: DateTime<Utc>, reason: &str) -> Self {
        Self {
            customer_id,
            sent_at,
            scenario: None,
            events_count: None,
            message_preview: None,
            delivery_status: DeliveryStatus::Skipped,
            error_message: Some(reason.to_string()),
        }
    }
}

impl MessageLog {
    /// Materialize an appended row
    pub fn from_new(entry: NewMessageLog, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id: entry.customer_id,
            sent_at: entry.sent_at,
            scenario: entry.scenario,
            events_count: entry.events_count,
            message_preview: entry.message_preview,
            delivery_status: entry.delivery_status,
            error_message: entry.error_message,
            created_at: now,
        }
    }
}
