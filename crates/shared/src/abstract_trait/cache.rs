use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CacheError;

pub type DynCacheBackend = Arc<dyn CacheBackendTrait + Send + Sync>;

#[async_trait]
pub trait CacheBackendTrait {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Sets the key only if absent. Returns true when this caller won the slot.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError>;
}
