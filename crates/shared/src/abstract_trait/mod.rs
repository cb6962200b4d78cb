mod cache;
mod kafka;

pub use self::cache::{CacheBackendTrait, DynCacheBackend};
pub use self::kafka::{DynKafka, KafkaTrait};
