// Outbound delivery through the chat and email relays
// The relays own message composition and calendar access; this side only
// decides who gets a message and records what happened.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::models::{Customer, MessageScenario};

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Delivery rejected with status {status}")]
    Rejected { status: u16, terminal: bool },

    #[error("Customer has no {0} on file")]
    MissingContact(&'static str),
}

impl NotifierError {
    /// The recipient can no longer be reached (chat blocked, calendar access revoked)
    pub fn is_terminal(&self) -> bool {
        matches!(self, NotifierError::Rejected { terminal: true, .. })
    }
}

/// What the relay reported about a delivered reminder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    #[serde(default)]
    pub scenario: Option<MessageScenario>,
    #[serde(default)]
    pub events_count: Option<i32>,
    #[serde(default)]
    pub preview: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_reminder(&self, customer: &Customer) -> Result<DeliveryReceipt, NotifierError>;

    async fn send_onboarding_nudge(&self, customer: &Customer) -> Result<(), NotifierError>;
}

#[derive(Debug, Serialize)]
struct ReminderPayload<'a> {
    customer_id: String,
    chat_id: &'a str,
    refresh_credential: &'a str,
    calendar_ids: &'a [String],
    timezone: &'a str,
    send_hour: &'a str,
    display_name: &'a str,
}

#[derive(Debug, Serialize)]
struct NudgePayload<'a> {
    to: &'a str,
    name: &'a str,
    order_token: &'a str,
}

/// HTTP relay client
#[derive(Clone)]
pub struct HttpNotifier {
    client: Arc<Client>,
    chat_url: String,
    email_url: String,
    api_key: String,
}

impl HttpNotifier {
    pub fn new(
        chat_url: String,
        email_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            chat_url,
            email_url,
            api_key,
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        payload: &T,
    ) -> Result<reqwest::Response, NotifierError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!("Network error while contacting relay: {:?}", e);
                NotifierError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("Relay rejected delivery. Status: {}, Error: {}", status, error_text);

        Err(NotifierError::Rejected {
            status: status.as_u16(),
            terminal: is_terminal_status(status),
        })
    }
}

/// 403 and 410 mean the recipient revoked access; anything else may succeed later
fn is_terminal_status(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::GONE
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip_all, fields(customer_id = %customer.id))]
    async fn send_reminder(&self, customer: &Customer) -> Result<DeliveryReceipt, NotifierError> {
        let chat_id = customer
            .chat_id
            .as_deref()
            .ok_or(NotifierError::MissingContact("chat id"))?;
        let refresh_credential = customer
            .refresh_credential
            .as_deref()
            .ok_or(NotifierError::MissingContact("calendar credential"))?;

        let payload = ReminderPayload {
            customer_id: customer.id.to_string(),
            chat_id,
            refresh_credential,
            calendar_ids: &customer.selected_resource_ids,
            timezone: &customer.timezone,
            send_hour: &customer.send_hour,
            display_name: &customer.user_name,
        };

        let response = self.post(&self.chat_url, &payload).await?;
        // An empty or unexpected body still means the message went out
        let receipt = response.json::<DeliveryReceipt>().await.unwrap_or_default();

        info!("Reminder delivered");
        Ok(receipt)
    }

    #[instrument(skip_all, fields(customer_id = %customer.id))]
    async fn send_onboarding_nudge(&self, customer: &Customer) -> Result<(), NotifierError> {
        if customer.email.is_empty() {
            return Err(NotifierError::MissingContact("email"));
        }

        let payload = NudgePayload {
            to: &customer.email,
            name: &customer.user_name,
            order_token: &customer.order_token,
        };

        self.post(&self.email_url, &payload).await?;

        info!("Onboarding nudge delivered");
        Ok(())
    }
}
