use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the relational store layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("database unavailable: {0}")]
    StoreUnavailable(String),

    #[error("failed to bind security context: {0}")]
    SecurityContext(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Open the process pool.
///
/// Ceilings default serverless-small (2 open, short idle, bounded lifetime)
/// on the assumption of many short-lived horizontally scaled instances;
/// every limit is configurable. `max_lifetime` recycles connections so stale
/// routing state in the network path to the database ages out.
pub async fn connect_pool(cfg: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let url = std::env::var("DATABASE_URL")
        .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.max_lifetime_secs))
        .connect(&url)
        .await
        .map_err(|e| DatabaseError::StoreUnavailable(e.to_string()))?;

    info!(
        max = cfg.max_connections,
        min = cfg.min_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Ping the pool to confirm connectivity.
pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
