// Embedded schema migrations for the customers and message_log tables.
// MigrationHarness is sync, so every call runs on a blocking thread with its own connection.

use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;
use tracing::{debug, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/diesel");

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Cannot connect for migrations: {0}")]
    Connect(String),

    #[error("Migration harness error: {0}")]
    Harness(String),

    #[error("Migration task aborted: {0}")]
    Aborted(String),
}

async fn with_sync_connection<T, F>(database_url: String, work: F) -> Result<T, MigrationError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, MigrationError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url)
            .map_err(|e| MigrationError::Connect(e.to_string()))?;
        work(&mut conn)
    })
    .await
    .map_err(|e| MigrationError::Aborted(e.to_string()))?
}

/// Apply pending migrations, returning the versions applied in this call
pub async fn run_migrations(database_url: String) -> Result<Vec<String>, MigrationError> {
    let applied = with_sync_connection(database_url, |conn| {
        let versions = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| MigrationError::Harness(e.to_string()))?;
        Ok(versions.iter().map(|v| v.to_string()).collect::<Vec<_>>())
    })
    .await?;

    for version in &applied {
        debug!("[DIESEL] Applied migration {}", version);
    }
    info!("[DIESEL] {} migration(s) applied", applied.len());

    Ok(applied)
}

/// Names of migrations not yet applied
pub async fn pending_migrations(database_url: String) -> Result<Vec<String>, MigrationError> {
    with_sync_connection(database_url, |conn| {
        let pending = conn
            .pending_migrations(MIGRATIONS)
            .map_err(|e| MigrationError::Harness(e.to_string()))?;
        Ok(pending.iter().map(|m| m.name().to_string()).collect())
    })
    .await
}
