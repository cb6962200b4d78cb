use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub kafka_broker: String,
    pub http_port: u16,
    pub run_migrations: bool,
    pub provider_failure_rate: f64,
    pub provider_delay_ms: u64,
}

impl Config {
    pub fn init() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("Missing environment variable: DATABASE_URL")?;

        let kafka_broker =
            std::env::var("KAFKA").context("Missing environment variable: KAFKA")?;

        let http_port = std::env::var("PAYMENT_HTTP_PORT")
            .unwrap_or_else(|_| "8083".to_string())
            .parse::<u16>()
            .context("PAYMENT_HTTP_PORT must be a valid u16 integer")?;

        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let provider_failure_rate = std::env::var("PROVIDER_FAILURE_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.1);

        let provider_delay_ms = std::env::var("PROVIDER_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            kafka_broker,
            http_port,
            run_migrations,
            provider_failure_rate,
            provider_delay_ms,
        })
    }
}
