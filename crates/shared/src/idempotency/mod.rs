use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::abstract_trait::DynCacheBackend;

pub const KEY_PREFIX: &str = "idempotency:";
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub status_code: i32,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Outcome cache keyed by a digest of (user, operation, client key). It is a
/// latency optimisation, not a lock: lookups fail open and stores never fail
/// the caller. The definitive dedupe point is the database constraint.
#[derive(Clone)]
pub struct IdempotencyStore {
    backend: DynCacheBackend,
    ttl: Duration,
}

impl IdempotencyStore {
    pub fn new(backend: DynCacheBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn generate_key(user_id: &str, operation: &str, client_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(user_id.as_bytes());
        hasher.update(b":");
        hasher.update(operation.as_bytes());
        hasher.update(b":");
        hasher.update(client_key.as_bytes());
        format!("{KEY_PREFIX}{}", hex::encode(hasher.finalize()))
    }

    pub async fn get(&self, key: &str) -> Option<IdempotencyRecord> {
        match self.backend.get(key).await {
            Ok(Some(data)) => match serde_json::from_str::<IdempotencyRecord>(&data) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Failed to decode idempotency record for '{key}': {e:?}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Idempotency lookup failed, treating as miss: {e:?}");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, status_code: i32, body: serde_json::Value) {
        let record = IdempotencyRecord {
            status_code,
            body,
            created_at: Utc::now(),
        };

        let data = match serde_json::to_string(&record) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to encode idempotency record: {e:?}");
                return;
            }
        };

        if let Err(e) = self.backend.set(key, &data, self.ttl).await {
            warn!("Failed to store idempotency record for '{key}': {e:?}");
        } else {
            info!("Stored idempotency record for '{key}'");
        }
    }

    /// Claims a one-shot slot, used by consumers to dedupe on message id.
    pub async fn claim(&self, key: &str) -> bool {
        match self.backend.set_nx(key, "processed", self.ttl).await {
            Ok(won) => won,
            Err(e) => {
                warn!("Idempotency claim failed, processing anyway: {e:?}");
                true
            }
        }
    }

    /// Gives a claim back so a redelivery can retry after a handler failure.
    pub async fn release_claim(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            warn!("Failed to release idempotency claim '{key}': {e:?}");
        }
    }
}
