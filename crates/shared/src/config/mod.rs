mod database;
mod kafka;
mod redis;
mod settings;

pub use self::database::{ConnectionManager, ConnectionPool};
pub use self::kafka::Kafka;
pub use self::redis::{RedisConfig, RedisPool};
pub use self::settings::CoreSettings;
