use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::abstract_trait::inventory::service::DynInventoryCommandService;

pub async fn run_reaper(
    command: DynInventoryCommandService,
    interval: Duration,
    running: Arc<AtomicBool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!("⏰ Reservation reaper started (every {:?})", interval);
    running.store(true, Ordering::SeqCst);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("🛑 Reservation reaper received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                match command.reap_expired().await {
                    Ok(0) => {}
                    Ok(released) => info!("♻️ Reaper released {released} expired reservations"),
                    Err(e) => error!("❌ Reaper tick failed: {e:?}"),
                }
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    info!("✅ Reservation reaper stopped gracefully");
}

#[cfg(test)]
mod tests {
    use prometheus_client::registry::Registry;

    use super::*;
    use crate::domain::requests::ReserveStockRequest;
    use crate::abstract_trait::inventory::service::InventoryCommandServiceTrait;
    use crate::model::ReservationItem;
    use crate::service::inventory::InventoryCommandService;
    use crate::service::inventory::testing::{FakeInventoryRepository, FakeKafka};

    #[tokio::test]
    async fn reaper_loop_releases_expired_holds_and_stops_on_shutdown() {
        let repo = Arc::new(FakeInventoryRepository::default());
        repo.seed("p1", 5).await;

        let mut registry = Registry::default();
        let service: DynInventoryCommandService = Arc::new(InventoryCommandService::new(
            repo.clone(),
            Arc::new(FakeKafka::default()),
            900,
            &mut registry,
        ));

        service
            .reserve_stock(&ReserveStockRequest {
                reservation_id: "r1".into(),
                items: vec![ReservationItem {
                    product_id: "p1".into(),
                    quantity: 5,
                }],
                ttl_seconds: Some(1),
            })
            .await
            .unwrap();
        repo.expire_all().await;

        let running = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let worker = tokio::spawn(run_reaper(
            service,
            Duration::from_millis(10),
            running.clone(),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(running.load(Ordering::SeqCst));

        shutdown_tx.send(()).unwrap();
        worker.await.unwrap();
        assert!(!running.load(Ordering::SeqCst));

        let row = repo.row("p1").await;
        assert_eq!(row.available_quantity, 5);
        assert_eq!(row.reserved_quantity, 0);
    }
}
