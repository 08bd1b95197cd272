use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::DbConfig;

/// Catalog schema, embedded from `crates/stride-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Open a pool against the catalog database.
///
/// The CLI runs one command per process, so a handful of connections is
/// plenty.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to catalog database at {}", config.database_url))
}

/// Bring the catalog schema up to date.
///
/// Returns the version of the newest embedded migration.
pub async fn run_migrations(pool: &PgPool) -> Result<i64> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to migrate catalog schema")?;

    let version = MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0);
    info!(version, "catalog schema is current");
    Ok(version)
}
