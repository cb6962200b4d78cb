use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_port: u16,
    pub run_migrations: bool,
}

impl Config {
    pub fn init() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("Missing environment variable: DATABASE_URL")?;

        let http_port = std::env::var("CATALOG_HTTP_PORT")
            .unwrap_or_else(|_| "8084".to_string())
            .parse::<u16>()
            .context("CATALOG_HTTP_PORT must be a valid u16 integer")?;

        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            http_port,
            run_migrations,
        })
    }
}
