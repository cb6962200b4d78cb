pub mod abstract_trait;
pub mod breaker;
pub mod cache;
pub mod config;
pub mod errors;
pub mod events;
pub mod idempotency;
pub mod outbox;
pub mod utils;
