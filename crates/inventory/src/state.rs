use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use prometheus_client::registry::Registry;
use shared::config::ConnectionPool;
use tokio::sync::Mutex;

use crate::di::DependenciesInject;

pub struct AppState {
    pub di_container: DependenciesInject,
    pub registry: Mutex<Registry>,
    pub pool: ConnectionPool,
    pub reaper_running: Arc<AtomicBool>,
    pub consumer_running: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        di_container: DependenciesInject,
        registry: Registry,
        pool: ConnectionPool,
        reaper_running: Arc<AtomicBool>,
        consumer_running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            di_container,
            registry: Mutex::new(registry),
            pool,
            reaper_running,
            consumer_running,
        }
    }
}
