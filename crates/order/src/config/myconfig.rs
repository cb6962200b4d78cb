use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub kafka_broker: String,
    pub http_port: u16,
    pub run_migrations: bool,
}

impl Config {
    pub fn init() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("Missing environment variable: DATABASE_URL")?;

        let kafka_broker =
            std::env::var("KAFKA").context("Missing environment variable: KAFKA")?;

        let http_port = std::env::var("ORDER_HTTP_PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse::<u16>()
            .context("ORDER_HTTP_PORT must be a valid u16 integer")?;

        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            kafka_broker,
            http_port,
            run_migrations,
        })
    }
}
