// Inbound payload schemas
// Format errors are rejected here, before any customer store access

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::SEND_HOUR_REGEX;

/// Order-created event delivered by the shop webhook
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderWebhookPayload {
    #[validate(range(min = 1, message = "Order id must be positive"))]
    pub order_id: i64,

    #[validate(
        email(message = "Please provide a valid email address"),
        length(max = 320, message = "Email must be at most 320 characters")
    )]
    pub customer_email: String,

    #[validate(length(max = 255, message = "Customer name must be at most 255 characters"))]
    pub customer_name: String,

    // Carried by the shop but unused by intake
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Onboarding form submission
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OnboardingRequest {
    #[validate(length(min = 5, max = 50, message = "Phone number must be 5 to 50 characters"))]
    pub phone: String,

    #[validate(length(min = 1, max = 64, message = "Timezone must be 1 to 64 characters"))]
    pub timezone: String,

    #[validate(regex(path = "SEND_HOUR_REGEX", message = "Send hour must be in HH:MM format"))]
    pub send_hour: String,

    #[serde(alias = "ordertoken")]
    #[validate(length(min = 1, max = 64, message = "Order token must be 1 to 64 characters"))]
    pub order_token: String,

    #[validate(length(min = 1, max = 255, message = "Chat id must be 1 to 255 characters"))]
    pub chat_id: String,

    #[validate(length(min = 1, message = "Calendar credential is required"))]
    pub refresh_credential: String,
}

/// Preferences save submission
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PreferencesRequest {
    pub calendar_ids: Vec<String>,

    #[validate(regex(path = "SEND_HOUR_REGEX", message = "Send hour must be in HH:MM format"))]
    pub send_hour: String,

    #[validate(length(min = 1, max = 64, message = "Timezone must be 1 to 64 characters"))]
    pub timezone: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Display name must be at most 255 characters"))]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_payload_validation() {
        let payload: OrderWebhookPayload = serde_json::from_value(serde_json::json!({
            "order_id": 1001,
            "customer_email": "a@x.com",
            "customer_name": "A",
            "status": "processing"
        }))
        .unwrap();
        assert!(payload.validate().is_ok());

        let bad_email = OrderWebhookPayload {
            customer_email: "not-an-email".to_string(),
            ..payload
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_order_payload_requires_order_id() {
        let result: Result<OrderWebhookPayload, _> = serde_json::from_value(serde_json::json!({
            "customer_email": "a@x.com",
            "customer_name": "A"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_onboarding_accepts_legacy_token_field() {
        let request: OnboardingRequest = serde_json::from_value(serde_json::json!({
            "phone": "+15551234",
            "timezone": "Europe/Paris",
            "send_hour": "07:30",
            "ordertoken": "abc",
            "chat_id": "99",
            "refresh_credential": "rt"
        }))
        .unwrap();
        assert_eq!(request.order_token, "abc");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_onboarding_rejects_bad_fields() {
        let request = OnboardingRequest {
            phone: "123".to_string(),
            timezone: "".to_string(),
            send_hour: "7am".to_string(),
            order_token: "abc".to_string(),
            chat_id: "99".to_string(),
            refresh_credential: "rt".to_string(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("timezone"));
        assert!(fields.contains_key("send_hour"));
    }

    #[test]
    fn test_preferences_validation() {
        let request = PreferencesRequest {
            calendar_ids: vec!["primary".to_string()],
            send_hour: "06:45".to_string(),
            timezone: "UTC".to_string(),
            display_name: None,
        };
        assert!(request.validate().is_ok());

        let bad = PreferencesRequest {
            send_hour: "6:45".to_string(),
            ..request
        };
        assert!(bad.validate().is_err());
    }

    fn long(n: usize) -> String {
        "x".repeat(n)
    }

    #[test]
    fn test_order_payload_respects_column_widths() {
        let payload = OrderWebhookPayload {
            order_id: 1,
            customer_email: "a@x.com".to_string(),
            customer_name: long(255),
            status: None,
            total: None,
            currency: None,
            created_at: None,
        };
        assert!(payload.validate().is_ok());

        let long_name = OrderWebhookPayload {
            customer_name: long(256),
            ..payload.clone()
        };
        let errors = long_name.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("customer_name"));

        let long_email = OrderWebhookPayload {
            customer_email: format!("{}@x.com", long(320)),
            ..payload
        };
        let errors = long_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("customer_email"));
    }

    #[test]
    fn test_onboarding_respects_column_widths() {
        let request = OnboardingRequest {
            phone: long(50),
            timezone: long(64),
            send_hour: "07:30".to_string(),
            order_token: long(64),
            chat_id: long(255),
            refresh_credential: long(2048),
        };
        assert!(request.validate().is_ok());

        let too_long = OnboardingRequest {
            phone: long(51),
            timezone: long(65),
            send_hour: "07:30".to_string(),
            order_token: long(65),
            chat_id: long(256),
            refresh_credential: "rt".to_string(),
        };
        let errors = too_long.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("timezone"));
        assert!(fields.contains_key("order_token"));
        assert!(fields.contains_key("chat_id"));
        assert!(!fields.contains_key("refresh_credential"));
    }

    #[test]
    fn test_preferences_respect_column_widths() {
        let request = PreferencesRequest {
            calendar_ids: vec![],
            send_hour: "06:45".to_string(),
            timezone: long(64),
            display_name: Some(long(255)),
        };
        assert!(request.validate().is_ok());

        let too_long = PreferencesRequest {
            timezone: long(65),
            display_name: Some(long(256)),
            ..request
        };
        let errors = too_long.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("timezone"));
        assert!(fields.contains_key("display_name"));
    }
}
