// Common test utilities and helper structs
// Shared across all test files to avoid duplication
#![allow(dead_code)]

use agenda_backend_core::{
    app::{AppState, AppStateParts},
    build_router,
    models::{
        Customer, NewCustomer, NewMessageLog, OnboardingDetails, OnboardingStatus,
        PreferenceChange,
    },
    services::{
        notifier::{DeliveryReceipt, Notifier, NotifierError},
        AntiFloodPolicy, SessionService,
    },
    store::{
        CompletionOutcome, CustomerStore, InsertOutcome, MemoryCustomerStore, MemoryMessageLog,
        MessageLogStore, PreferenceOutcome, StoreError,
    },
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const SESSION_SECRET: &str = "integration-session-secret-32-chars-min";
pub const CRON_SECRET: &str = "integration-cron-secret";

/// Fixed instant used by service-level tests
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap()
}

// =============================================================================
// NOTIFIER DOUBLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
    Transient,
    Terminal,
}

/// Records deliveries and fails for configured customers
#[derive(Default)]
pub struct RecordingNotifier {
    reminders: Mutex<Vec<Uuid>>,
    nudges: Mutex<Vec<Uuid>>,
    failures: Mutex<HashMap<Uuid, Failure>>,
}

impl RecordingNotifier {
    pub fn fail_for(&self, customer_id: Uuid, failure: Failure) {
        self.failures.lock().unwrap().insert(customer_id, failure);
    }

    pub fn reminders(&self) -> Vec<Uuid> {
        self.reminders.lock().unwrap().clone()
    }

    pub fn nudges(&self) -> Vec<Uuid> {
        self.nudges.lock().unwrap().clone()
    }

    fn check(&self, customer_id: Uuid) -> Result<(), NotifierError> {
        match self.failures.lock().unwrap().get(&customer_id) {
            None => Ok(()),
            Some(Failure::Transient) => Err(NotifierError::Rejected {
                status: 503,
                terminal: false,
            }),
            Some(Failure::Terminal) => Err(NotifierError::Rejected {
                status: 403,
                terminal: true,
            }),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_reminder(&self, customer: &Customer) -> Result<DeliveryReceipt, NotifierError> {
        self.check(customer.id)?;
        self.reminders.lock().unwrap().push(customer.id);
        Ok(DeliveryReceipt {
            scenario: None,
            events_count: Some(2),
            preview: Some(format!("Good morning {}", customer.user_name)),
        })
    }

    async fn send_onboarding_nudge(&self, customer: &Customer) -> Result<(), NotifierError> {
        self.check(customer.id)?;
        self.nudges.lock().unwrap().push(customer.id);
        Ok(())
    }
}

/// Message log whose writes always fail
#[derive(Default)]
pub struct FailingMessageLog;

#[async_trait]
impl MessageLogStore for FailingMessageLog {
    async fn append(&self, _entry: NewMessageLog) -> Result<(), StoreError> {
        Err(StoreError::Database("message_log is read-only".to_string()))
    }
}

/// Customer store whose delivery bookkeeping writes always fail
#[derive(Default)]
pub struct BrokenBookkeepingStore {
    pub inner: MemoryCustomerStore,
}

fn bookkeeping_down() -> StoreError {
    StoreError::Database("bookkeeping unavailable".to_string())
}

#[async_trait]
impl CustomerStore for BrokenBookkeepingStore {
    async fn insert_if_absent(
        &self,
        new_customer: NewCustomer,
    ) -> Result<InsertOutcome, StoreError> {
        self.inner.insert_if_absent(new_customer).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_order_token(&self, token: &str) -> Result<Option<Customer>, StoreError> {
        self.inner.find_by_order_token(token).await
    }

    async fn find_by_auth_identity(
        &self,
        identity: &str,
    ) -> Result<Option<Customer>, StoreError> {
        self.inner.find_by_auth_identity(identity).await
    }

    async fn complete_onboarding(
        &self,
        token: &str,
        details: OnboardingDetails,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, StoreError> {
        self.inner.complete_onboarding(token, details, now).await
    }

    async fn apply_preferences(
        &self,
        id: Uuid,
        change: PreferenceChange,
        policy: &AntiFloodPolicy,
        now: DateTime<Utc>,
    ) -> Result<PreferenceOutcome, StoreError> {
        self.inner.apply_preferences(id, change, policy, now).await
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.inner.list_customers().await
    }

    async fn record_sent(&self, _id: Uuid, _now: DateTime<Utc>) -> Result<(), StoreError> {
        Err(bookkeeping_down())
    }

    async fn record_nudge(&self, _id: Uuid, _now: DateTime<Utc>) -> Result<(), StoreError> {
        Err(bookkeeping_down())
    }

    async fn deactivate(&self, _id: Uuid) -> Result<(), StoreError> {
        Err(bookkeeping_down())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn order_payload(order_id: i64, email: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "order_id": order_id,
        "customer_email": email,
        "customer_name": name,
        "status": "processing",
        "total": "49.00",
        "currency": "EUR"
    })
}

pub fn onboarding_payload(order_token: &str) -> serde_json::Value {
    serde_json::json!({
        "phone": "+33612345678",
        "timezone": "Europe/Paris",
        "send_hour": "07:30",
        "order_token": order_token,
        "chat_id": "123456789",
        "refresh_credential": "calendar-refresh-credential"
    })
}

pub fn preferences_payload(calendar_ids: &[&str], send_hour: &str) -> serde_json::Value {
    serde_json::json!({
        "calendar_ids": calendar_ids,
        "send_hour": send_hour,
        "timezone": "Europe/Paris"
    })
}

/// A pending customer created `age` before `now`
pub fn pending_customer(order_id: i64, now: DateTime<Utc>, age: Duration) -> Customer {
    Customer::from_new(
        NewCustomer::from_order(
            order_id,
            format!("customer{}@example.com", order_id),
            format!("Customer {}", order_id),
            format!("order-token-{}", order_id),
        ),
        now - age,
    )
}

/// A customer ready for reminders
pub fn onboarded_customer(order_id: i64, now: DateTime<Utc>) -> Customer {
    let mut customer = pending_customer(order_id, now, Duration::days(3));
    customer.onboarding_status = OnboardingStatus::Complete;
    customer.chat_id = Some(format!("chat-{}", order_id));
    customer.refresh_credential = Some("refresh".to_string());
    customer.auth_identity = Some(format!("identity-{}", order_id));
    customer.onboarding_last_nudge_at = Some(now - Duration::days(3));
    customer
}

// =============================================================================
// TEST APPLICATION
// =============================================================================

/// Test application wrapper backed by in-memory stores
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: MemoryCustomerStore,
    pub message_log: MemoryMessageLog,
    pub notifier: Arc<RecordingNotifier>,
    pub sessions: SessionService,
}

impl TestApp {
    /// Send a POST request
    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    /// Send a GET request
    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    pub fn session_token(&self, identity: &str) -> String {
        self.sessions.issue(identity, 3600).unwrap()
    }
}

/// Setup test application with all dependencies
pub fn setup_test_app() -> TestApp {
    setup_test_app_with_policy(AntiFloodPolicy::default())
}

pub fn setup_test_app_with_policy(policy: AntiFloodPolicy) -> TestApp {
    let store = MemoryCustomerStore::new();
    let message_log = MemoryMessageLog::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let sessions = SessionService::new(SESSION_SECRET, "session");

    let state = AppState::new(AppStateParts {
        customer_store: Arc::new(store.clone()),
        message_log: Arc::new(message_log.clone()),
        notifier: notifier.clone(),
        session_service: sessions.clone(),
        anti_flood: policy,
        nudge_interval: Duration::hours(48),
        cron_secret: CRON_SECRET.to_string(),
    });

    TestApp {
        app: build_router(state.clone()),
        state,
        store,
        message_log,
        notifier,
        sessions,
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: &'static str,
    uri: String,
    headers: Vec<(header::HeaderName, String)>,
    body: Option<Vec<u8>>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &'static str, uri: &str) -> Self {
        Self {
            app,
            method,
            uri: uri.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Some(serde_json::to_vec(body).unwrap());
        self.headers
            .push((header::CONTENT_TYPE, "application/json".to_string()));
        self
    }

    /// Attach a session cookie for `identity`
    pub fn with_session(mut self, identity: &str) -> Self {
        let token = self.app.session_token(identity);
        self.headers
            .push((header::COOKIE, format!("session={}", token)));
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers
            .push((header::AUTHORIZATION, format!("Bearer {}", token)));
        self
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(self.body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.app.app.clone().oneshot(request).await.unwrap();

        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
