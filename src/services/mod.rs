// Services module
// Business logic layer for the customer lifecycle

pub mod background_tasks;
pub mod intake;
pub mod notifier;
pub mod onboarding;
pub mod preferences;
pub mod scheduler;
pub mod session;

// Re-export commonly used services
pub use background_tasks::initialize_background_tasks;
pub use intake::{IntakeOutcome, IntakeService};
pub use notifier::{DeliveryReceipt, HttpNotifier, Notifier, NotifierError};
pub use onboarding::OnboardingService;
pub use preferences::{
    AntiFloodPolicy, PolicyDecision, PreferencesService, PreferencesView, RejectReason,
};
pub use scheduler::{
    select_nudge_targets, select_reminder_targets, NudgeStats, ReminderScheduler,
    ReminderStats, RunReport,
};
pub use session::{SessionClaims, SessionError, SessionService};
