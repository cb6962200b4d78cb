use std::time::Duration;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub outbox_poll_interval: Duration,
    pub outbox_batch_size: i64,
    pub reservation_default_ttl_secs: i64,
    pub reservation_reaper_interval: Duration,
    pub payment_circuit_max_failures: u32,
    pub payment_circuit_timeout: Duration,
    pub payment_circuit_reset_timeout: Duration,
    pub idempotency_ttl: Duration,
    pub catalog_product_ttl: Duration,
    pub catalog_list_ttl: Duration,
    pub db_max_open_conns: u32,
    pub db_min_conns: u32,
}

impl CoreSettings {
    pub fn from_env() -> Self {
        Self {
            outbox_poll_interval: Duration::from_secs(env_u64("OUTBOX_POLL_INTERVAL_SECS", 5)),
            outbox_batch_size: env_u64("OUTBOX_BATCH_SIZE", 100) as i64,
            reservation_default_ttl_secs: env_u64("RESERVATION_DEFAULT_TTL_SECS", 900) as i64,
            reservation_reaper_interval: Duration::from_secs(env_u64(
                "RESERVATION_REAPER_INTERVAL_SECS",
                60,
            )),
            payment_circuit_max_failures: env_u32("PAYMENT_CIRCUIT_MAX_FAILURES", 5),
            payment_circuit_timeout: Duration::from_secs(env_u64(
                "PAYMENT_CIRCUIT_TIMEOUT_SECS",
                10,
            )),
            payment_circuit_reset_timeout: Duration::from_secs(env_u64(
                "PAYMENT_CIRCUIT_RESET_TIMEOUT_SECS",
                30,
            )),
            idempotency_ttl: Duration::from_secs(env_u64("IDEMPOTENCY_TTL_SECS", 24 * 60 * 60)),
            catalog_product_ttl: Duration::from_secs(env_u64("CATALOG_PRODUCT_TTL_SECS", 300)),
            catalog_list_ttl: Duration::from_secs(env_u64("CATALOG_LIST_TTL_SECS", 120)),
            db_max_open_conns: env_u32("DB_MAX_OPEN_CONNS", 25),
            db_min_conns: env_u32("DB_MIN_CONNS", 5),
        }
    }
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self::from_env()
    }
}
