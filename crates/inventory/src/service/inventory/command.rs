use async_trait::async_trait;
use prometheus_client::registry::Registry;
use shared::abstract_trait::DynKafka;
use shared::errors::ServiceError;
use shared::events::{
    StockItemPayload, StockReleasedPayload, StockReservedPayload, TOPIC_STOCK_RELEASED,
    TOPIC_STOCK_RESERVED,
};
use shared::utils::{Method, Metrics, Status};
use tokio::time::Instant;
use tracing::{error, info};

use crate::abstract_trait::inventory::repository::DynInventoryCommandRepository;
use crate::abstract_trait::inventory::service::InventoryCommandServiceTrait;
use crate::domain::requests::{AdjustInventoryRequest, ReserveStockRequest};
use crate::domain::response::InventoryResponse;

#[derive(Clone)]
pub struct InventoryCommandService {
    command: DynInventoryCommandRepository,
    kafka: DynKafka,
    metrics: Metrics,
    default_ttl_seconds: i64,
}

impl InventoryCommandService {
    pub fn new(
        command: DynInventoryCommandRepository,
        kafka: DynKafka,
        default_ttl_seconds: i64,
        registry: &mut Registry,
    ) -> Self {
        let metrics = Metrics::new();
        metrics.register("inventory_command_service", registry);

        Self {
            command,
            kafka,
            metrics,
            default_ttl_seconds,
        }
    }

    async fn publish(&self, topic: &str, key: &str, payload: &impl serde::Serialize) {
        // Stock events are best-effort: the database is the source of truth
        // and the inventory service carries no outbox table.
        match serde_json::to_vec(payload) {
            Ok(bytes) => {
                if let Err(e) = self.kafka.publish(topic, key, &bytes).await {
                    error!("❌ Failed to publish {topic} event: {e:?}");
                }
            }
            Err(e) => error!("❌ Failed to serialize {topic} event: {e:?}"),
        }
    }
}

#[async_trait]
impl InventoryCommandServiceTrait for InventoryCommandService {
    async fn reserve_stock(&self, req: &ReserveStockRequest) -> Result<(), ServiceError> {
        let started = Instant::now();

        if req.items.is_empty() {
            return Err(ServiceError::Validation(vec![
                "Reservation items cannot be empty".to_string(),
            ]));
        }
        if req.items.iter().any(|item| item.quantity < 1) {
            return Err(ServiceError::Validation(vec![
                "Reservation quantity must be at least 1".to_string(),
            ]));
        }

        let ttl_seconds = req
            .ttl_seconds
            .filter(|ttl| *ttl > 0)
            .unwrap_or(self.default_ttl_seconds);

        info!(
            "📦 Reserving stock | reservation={} items={} ttl={}s",
            req.reservation_id,
            req.items.len(),
            ttl_seconds
        );

        if let Err(e) = self
            .command
            .reserve(&req.reservation_id, &req.items, ttl_seconds)
            .await
        {
            self.metrics
                .record(Method::Post, Status::Error, started.elapsed().as_secs_f64());
            return Err(ServiceError::Repo(e));
        }

        let payload = StockReservedPayload {
            reservation_id: req.reservation_id.clone(),
            items: req
                .items
                .iter()
                .map(|item| StockItemPayload {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                })
                .collect(),
        };
        self.publish(TOPIC_STOCK_RESERVED, &req.reservation_id, &payload)
            .await;

        self.metrics
            .record(Method::Post, Status::Success, started.elapsed().as_secs_f64());
        Ok(())
    }

    async fn commit_stock(&self, reservation_id: &str) -> Result<(), ServiceError> {
        let items = self
            .command
            .commit(reservation_id)
            .await
            .map_err(ServiceError::Repo)?;

        info!(
            "✅ Stock committed | reservation={} items={}",
            reservation_id,
            items.len()
        );
        Ok(())
    }

    async fn release_stock(&self, reservation_id: &str, reason: &str) -> Result<(), ServiceError> {
        let items = self
            .command
            .release(reservation_id)
            .await
            .map_err(ServiceError::Repo)?;

        let payload = StockReleasedPayload {
            reservation_id: reservation_id.to_string(),
            reason: reason.to_string(),
        };
        self.publish(TOPIC_STOCK_RELEASED, reservation_id, &payload)
            .await;

        info!(
            "♻️ Stock released | reservation={} items={} reason={}",
            reservation_id,
            items.len(),
            reason
        );
        Ok(())
    }

    async fn adjust_inventory(
        &self,
        req: &AdjustInventoryRequest,
    ) -> Result<InventoryResponse, ServiceError> {
        if req.delta == 0 {
            return Err(ServiceError::Validation(vec![
                "Adjustment delta cannot be zero".to_string(),
            ]));
        }

        let row = self
            .command
            .adjust(&req.product_id, req.delta)
            .await
            .map_err(ServiceError::Repo)?;

        info!(
            "🔧 Inventory adjusted | product={} delta={} reason={} available={}",
            req.product_id, req.delta, req.reason, row.available_quantity
        );
        Ok(InventoryResponse::from(row))
    }

    async fn reap_expired(&self) -> Result<i64, ServiceError> {
        let released = self
            .command
            .reap_expired()
            .await
            .map_err(ServiceError::Repo)?;

        if released > 0 {
            info!("⏰ Released {released} expired reservations");
        }
        Ok(released)
    }
}
