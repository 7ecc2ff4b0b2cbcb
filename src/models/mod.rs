pub mod customer;
pub mod message_log;
pub mod requests;

// Re-export common types
pub use customer::{
    Customer, NewCustomer, OnboardingDetails, OnboardingStatus, OrderTokenStatus,
    PreferenceChange,
};
pub use message_log::{DeliveryStatus, MessageLog, MessageScenario, NewMessageLog};
pub use requests::{OnboardingRequest, OrderWebhookPayload, PreferencesRequest};
