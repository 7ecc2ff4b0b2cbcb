// Middleware modules

pub mod auth;

// Re-export auth types
pub use auth::{AuthenticatedCustomer, SessionIdentity};
