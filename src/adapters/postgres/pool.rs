//! Connection pool setup and schema migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;

/// Opens a pool sized from `config`.
///
/// Fails with `Configuration` when no URL is set; callers are expected to
/// check `DatabaseConfig::is_configured` and fall back to memory adapters.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| sqlx::Error::Configuration("database url is not set".into()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "connected to postgres"
    );
    Ok(pool)
}

/// Applies the embedded migrations in `./migrations`.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
    tracing::info!("database migrations applied");
    Ok(())
}
