use std::time::Duration;

use anyhow::Context;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use tracing::info;

use crate::config::CoreSettings;

pub type ConnectionPool = Pool<Postgres>;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);
// Connections are recycled after five minutes so a rolling credential or
// failover never pins a stale session.
const MAX_LIFETIME: Duration = Duration::from_secs(300);

pub struct ConnectionManager;

impl ConnectionManager {
    pub async fn new_pool(
        connection_string: &str,
        settings: &CoreSettings,
    ) -> anyhow::Result<ConnectionPool> {
        info!(
            "Opening database pool (max {} / min {})",
            settings.db_max_open_conns, settings.db_min_conns
        );

        let pool = PgPoolOptions::new()
            .min_connections(settings.db_min_conns)
            .max_connections(settings.db_max_open_conns)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .max_lifetime(MAX_LIFETIME)
            .connect(connection_string)
            .await
            .context("Failed to create database connection pool")?;

        Ok(pool)
    }
}
