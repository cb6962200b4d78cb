use std::sync::Arc;

use anyhow::{Context, Result};
use order::config::Config;
use order::di::{DependenciesInject, DependenciesInjectDeps};
use order::metrics;
use order::state::AppState;
use shared::abstract_trait::DynKafka;
use shared::config::{ConnectionManager, CoreSettings, Kafka, RedisConfig, RedisPool};
use shared::outbox::{OutboxDispatcher, OutboxStore};
use shared::utils::{PoolMetrics, SystemMetrics, init_logger, run_metrics_collector};
use sqlx::{Pool, Postgres};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logger("order-service");

    let config = Config::init().context("Failed to load configuration")?;
    let settings = CoreSettings::from_env();

    let pool = ConnectionManager::new_pool(&config.database_url, &settings)
        .await
        .context("Failed to initialize database pool")?;

    if config.run_migrations {
        run_migrations(&pool).await.context("Failed to run migrations")?;
    }

    let redis = RedisPool::new(&RedisConfig::from_env()).context("Failed to connect to Redis")?;
    redis.ping().await.context("Failed to ping Redis server")?;

    let kafka: DynKafka = Arc::new(Kafka::new(&config.kafka_broker));
    let outbox = OutboxStore::new(pool.clone(), "outbox");

    let mut registry = prometheus_client::registry::Registry::default();

    let system_metrics = Arc::new(SystemMetrics::new());
    system_metrics.register(&mut registry);
    let pool_metrics = Arc::new(PoolMetrics::new());
    pool_metrics.register(&mut registry);

    let di_container = DependenciesInject::new(
        DependenciesInjectDeps {
            pool: pool.clone(),
            redis,
            outbox: outbox.clone(),
            settings: settings.clone(),
        },
        &mut registry,
    );

    let dispatcher = Arc::new(OutboxDispatcher::new(
        Arc::new(outbox),
        kafka,
        settings.outbox_poll_interval,
        settings.outbox_batch_size,
    ));

    let state = Arc::new(AppState::new(
        di_container,
        registry,
        pool.clone(),
        dispatcher.running_flag(),
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let dispatcher_handle = {
        let dispatcher = dispatcher.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { dispatcher.run(shutdown_rx).await })
    };

    tokio::spawn(run_metrics_collector(
        system_metrics,
        pool_metrics,
        pool.clone(),
        shutdown_tx.subscribe(),
    ));

    let http_handle = {
        let shutdown_rx = shutdown_tx.subscribe();
        let router = metrics::router(state);
        let addr = format!("0.0.0.0:{}", config.http_port);
        tokio::spawn(async move {
            if let Err(e) = serve_http(&addr, router, shutdown_rx).await {
                error!("HTTP server failed: {e}");
            }
        })
    };

    info!("✅ Order service started");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("🛑 Shutdown signal received (Ctrl+C).");

    if shutdown_tx.send(()).is_err() {
        warn!("No workers listening for shutdown");
    }

    let _ = dispatcher_handle.await;
    let _ = http_handle.await;

    info!("✅ Order service shutdown complete.");
    Ok(())
}

async fn serve_http(
    addr: &str,
    router: axum::Router,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Serving health and metrics on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .context("HTTP server error")
}

async fn run_migrations(pool: &Pool<Postgres>) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
