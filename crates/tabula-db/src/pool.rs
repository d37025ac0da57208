use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use tabula_core::config::DatabaseConfig;
use tabula_core::error::{Result, TabulaError};

/// Connect to Postgres and build the shared pool.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .map_err(|e| TabulaError::Database(e.to_string()))?;

    info!(max_connections = config.max_connections, "Database connection established");
    Ok(pool)
}

/// Create and populate the demo `users` table. Idempotent on the table
/// itself; rerunning appends another batch of rows.
pub async fn seed_demo_data(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(include_str!("../sql/seed_users.sql"))
        .execute(pool)
        .await
        .map_err(|e| TabulaError::Database(e.to_string()))?;
    info!("demo data seeded");
    Ok(())
}
