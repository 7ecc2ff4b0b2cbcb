// Application state shared across handlers
use std::sync::Arc;

use crate::{
    services::{
        notifier::Notifier, IntakeService, OnboardingService, PreferencesService,
        ReminderScheduler, SessionService,
    },
    store::{CustomerStore, MessageLogStore},
};

#[derive(Clone)]
pub struct AppState {
    pub customer_store: Arc<dyn CustomerStore>,
    pub intake_service: Arc<IntakeService>,
    pub onboarding_service: Arc<OnboardingService>,
    pub preferences_service: Arc<PreferencesService>,
    pub scheduler: Arc<ReminderScheduler>,
    pub session_service: Arc<SessionService>,
    pub cron_secret: Arc<str>,
}

/// Everything needed to assemble an `AppState`
pub struct AppStateParts {
    pub customer_store: Arc<dyn CustomerStore>,
    pub message_log: Arc<dyn MessageLogStore>,
    pub notifier: Arc<dyn Notifier>,
    pub session_service: SessionService,
    pub anti_flood: crate::services::AntiFloodPolicy,
    pub nudge_interval: chrono::Duration,
    pub cron_secret: String,
}

impl AppState {
    pub fn new(parts: AppStateParts) -> Self {
        let store = parts.customer_store;

        Self {
            intake_service: Arc::new(IntakeService::new(store.clone())),
            onboarding_service: Arc::new(OnboardingService::new(store.clone())),
            preferences_service: Arc::new(PreferencesService::new(
                store.clone(),
                parts.anti_flood,
            )),
            scheduler: Arc::new(ReminderScheduler::new(
                store.clone(),
                parts.message_log,
                parts.notifier,
                parts.nudge_interval,
            )),
            session_service: Arc::new(parts.session_service),
            cron_secret: Arc::from(parts.cron_secret),
            customer_store: store,
        }
    }
}
