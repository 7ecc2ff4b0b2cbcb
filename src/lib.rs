// Library exports for the agenda backend
// This file exposes modules and functions for library consumers

pub mod app;
pub mod app_config;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use app::{AppState, AppStateParts};
pub use app_config::{AppConfig, CONFIG};
pub use db::DieselPool;
pub use middleware::{AuthenticatedCustomer, SessionIdentity};
pub use services::{
    AntiFloodPolicy, IntakeOutcome, IntakeService, Notifier, OnboardingService,
    PreferencesService, RejectReason, ReminderScheduler, RunReport, SessionService,
};
pub use store::{CustomerStore, MessageLogStore, StoreError};
pub use utils::service_error::ServiceError;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Full HTTP surface under `/api`
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .nest("/webhooks", handlers::webhook_routes())
        .nest("/cron", handlers::cron_routes())
        .merge(handlers::customer_routes());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Library initialization function for the binary
// Connects to PostgreSQL, runs migrations and wires the services
pub async fn initialize_app_state(
    config: &AppConfig,
) -> Result<(AppState, DieselPool), Box<dyn std::error::Error>> {
    use std::sync::Arc;
    use tracing::info;

    info!("Initializing database pool...");
    let diesel_pool = db::create_diesel_pool(db::DieselDatabaseConfig::from(config)).await?;

    if migrations::should_run_migrations(config) {
        info!("Running embedded migrations...");
        migrations::run_all_migrations(migrations::MigrationConfig::from(config))
            .await
            .map_err(|e| format!("Migration failed: {}", e))?;
    }

    let notifier = services::HttpNotifier::new(
        config.notifier.chat_url.clone(),
        config.notifier.email_url.clone(),
        config.notifier.api_key.clone(),
        std::time::Duration::from_secs(config.notifier.timeout_seconds),
    )?;

    let state = AppState::new(AppStateParts {
        customer_store: Arc::new(store::PgCustomerStore::new(diesel_pool.clone())),
        message_log: Arc::new(store::PgMessageLog::new(diesel_pool.clone())),
        notifier: Arc::new(notifier),
        session_service: SessionService::new(
            &config.session.secret,
            config.session.cookie_name.clone(),
        ),
        anti_flood: config.anti_flood.policy(),
        nudge_interval: config.scheduler.nudge_interval(),
        cron_secret: config.cron.secret.clone(),
    });

    Ok((state, diesel_pool))
}

// Health check handler
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let timestamp = chrono::Utc::now().to_rfc3339();

    let (healthy, store_health) = match state.customer_store.health_check().await {
        Ok(()) => (
            true,
            serde_json::json!({
                "status": "healthy",
                "error": null
            }),
        ),
        Err(e) => (
            false,
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Store unavailable: {}", e)
            }),
        ),
    };

    let response = serde_json::json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "agenda-backend",
        "timestamp": timestamp,
        "components": {
            "customer_store": store_health
        }
    });

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
