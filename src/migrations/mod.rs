// Schema migrations, embedded in the binary and applied at startup

pub mod diesel;

use tracing::{error, info};

use crate::app_config::AppConfig;

pub use self::diesel::{MigrationError, MIGRATIONS};

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub database_url: String,
    pub skip: bool,
    pub environment: String,
}

impl From<&AppConfig> for MigrationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            database_url: config.database_url.clone(),
            skip: config.disable_embedded_migrations,
            environment: config.environment.to_string(),
        }
    }
}

/// Bring the customer store schema up to date
pub async fn run_all_migrations(config: MigrationConfig) -> Result<(), MigrationError> {
    if config.skip {
        info!("[MIGRATIONS] Embedded migrations disabled, skipping");
        return Ok(());
    }

    info!("[MIGRATIONS] Migrating schema ({})", config.environment);
    match self::diesel::run_migrations(config.database_url).await {
        Ok(applied) if applied.is_empty() => {
            info!("[MIGRATIONS] Schema already up to date");
            Ok(())
        },
        Ok(applied) => {
            info!("[MIGRATIONS] Schema now at {}", applied.join(", "));
            Ok(())
        },
        Err(e) => {
            error!("[MIGRATIONS] {}", e);
            Err(e)
        },
    }
}

pub fn should_run_migrations(config: &AppConfig) -> bool {
    !config.disable_embedded_migrations
}
