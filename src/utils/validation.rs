// Validation utilities for inbound payload fields

use once_cell::sync::Lazy;
use regex::Regex;

/// `HH:MM` on a 24 hour clock
pub static SEND_HOUR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid send hour regex"));

/// `None` if the field is absent or blank, otherwise the trimmed value
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Trim, drop blanks, and de-duplicate resource ids. Order is not meaningful.
pub fn normalize_resource_ids(ids: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// Flatten validator errors into `field: message, field: message`
pub fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let message = errors
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Invalid input".to_string());
            format!("{}: {}", field, message)
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
