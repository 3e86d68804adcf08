use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, SqlxPostgresConnector};
use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;
pub type OrmConn = DatabaseConnection;

const MAX_BACKOFF: Duration = Duration::from_secs(8);

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
}

/// Connect to Postgres, retrying with exponential backoff before giving up.
pub async fn connect_with_retry(database_url: &str, attempts: u32) -> Result<DbPool> {
    let mut delay = Duration::from_millis(500);
    let mut attempt = 1;
    loop {
        match pool_options().connect(database_url).await {
            Ok(pool) => return Ok(pool),
            Err(err) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    attempts,
                    retry_in_ms = %delay.as_millis(),
                    error = %err,
                    "database not reachable"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
                attempt += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("could not connect to database after {attempts} attempts")
                });
            }
        }
    }
}

/// Build a pool that only connects when first used.
pub fn lazy_pool(database_url: &str) -> Result<DbPool> {
    let pool = pool_options().connect_lazy(database_url)?;
    Ok(pool)
}

/// Wrap an existing pool in a SeaORM connection sharing the same connections.
pub fn orm_from_pool(pool: &DbPool) -> OrmConn {
    SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone())
}
