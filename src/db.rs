use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::DbConfig;

/// Connects to PostgreSQL, retrying `connect_retries` times before giving up.
pub async fn connect_with_retry(cfg: &DbConfig) -> anyhow::Result<PgPool> {
    let attempts = cfg.connect_retries.max(1);
    let mut attempt = 1;
    loop {
        info!(attempt, attempts, "connecting to database");
        match PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.url)
            .await
        {
            Ok(pool) => {
                info!("database connected");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                warn!(error = %e, attempt, "database connection failed; retrying");
                tokio::time::sleep(Duration::from_secs(cfg.connect_delay_secs)).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("connect to database after {attempts} attempts"))
            }
        }
    }
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}
