use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};

use crate::abstract_trait::DynCacheBackend;

/// Typed JSON facade over the cache backend. Every failure is swallowed and
/// logged so a degraded cache never fails the caller.
#[derive(Clone)]
pub struct CacheStore {
    backend: DynCacheBackend,
}

impl CacheStore {
    pub fn new(backend: DynCacheBackend) -> Self {
        Self { backend }
    }

    pub async fn get_from_cache<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.backend.get(key).await {
            Ok(Some(data)) => match serde_json::from_str::<T>(&data) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    error!(
                        "Failed to deserialize cached value for key '{}': {:?}",
                        key, e
                    );
                    None
                }
            },
            Ok(None) => {
                warn!("Cache miss for key: {key}");
                None
            }
            Err(e) => {
                error!("Cache get error for key '{}': {:?}", key, e);
                None
            }
        }
    }

    pub async fn set_to_cache<T>(&self, key: &str, data: &T, expiration: Duration)
    where
        T: Serialize,
    {
        let json_data = match serde_json::to_string(data) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize data for key '{}': {:?}", key, e);
                return;
            }
        };

        match self.backend.set(key, &json_data, expiration).await {
            Ok(()) => debug!("Cached key '{}' with TTL {:?}", key, expiration),
            Err(e) => error!("Failed to set cache key '{}': {:?}", key, e),
        }
    }

    pub async fn delete_from_cache(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            error!("Failed to delete key '{}': {:?}", key, e);
        }
    }

    pub async fn delete_by_prefix(&self, prefix: &str) {
        match self.backend.delete_by_prefix(prefix).await {
            Ok(count) => debug!("Invalidated {count} cached entries under '{prefix}'"),
            Err(e) => error!("Failed to delete keys with prefix '{}': {:?}", prefix, e),
        }
    }
}
