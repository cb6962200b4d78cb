use prometheus_client::registry::Registry;
use shared::config::ConnectionPool;
use tokio::sync::Mutex;

use crate::di::DependenciesInject;

pub struct AppState {
    pub di_container: DependenciesInject,
    pub registry: Mutex<Registry>,
    pub pool: ConnectionPool,
}

impl AppState {
    pub fn new(di_container: DependenciesInject, registry: Registry, pool: ConnectionPool) -> Self {
        Self {
            di_container,
            registry: Mutex::new(registry),
            pool,
        }
    }
}
