use agenda_backend_core::{
    app_config::config, build_router, db::mask_connection_string, initialize_app_state,
    services::initialize_background_tasks,
};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agenda_backend_core=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config();
    info!(
        "Starting agenda backend ({}) on {}",
        config.environment, config.bind_address
    );
    info!("Database URL: {}", mask_connection_string(&config.database_url));

    let (state, _pool) = initialize_app_state(config)
        .await
        .map_err(|e| anyhow::anyhow!("Initialization failed: {}", e))?;

    let _timer = initialize_background_tasks(
        state.scheduler.as_ref().clone(),
        config.scheduler.tick_interval(),
    );

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    info!("HTTP server listening on {}", config.bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
