use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::ServiceError;

use crate::domain::requests::{AdjustInventoryRequest, ReserveStockRequest};
use crate::domain::response::{InventoryResponse, ReservationResponse};

pub type DynInventoryCommandService = Arc<dyn InventoryCommandServiceTrait + Send + Sync>;
pub type DynInventoryQueryService = Arc<dyn InventoryQueryServiceTrait + Send + Sync>;

#[async_trait]
pub trait InventoryCommandServiceTrait {
    async fn reserve_stock(&self, req: &ReserveStockRequest) -> Result<(), ServiceError>;

    async fn commit_stock(&self, reservation_id: &str) -> Result<(), ServiceError>;

    async fn release_stock(&self, reservation_id: &str, reason: &str) -> Result<(), ServiceError>;

    async fn adjust_inventory(
        &self,
        req: &AdjustInventoryRequest,
    ) -> Result<InventoryResponse, ServiceError>;

    async fn reap_expired(&self) -> Result<i64, ServiceError>;
}

#[async_trait]
pub trait InventoryQueryServiceTrait {
    async fn get_inventory(&self, product_id: &str) -> Result<InventoryResponse, ServiceError>;

    async fn get_reservations(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<ReservationResponse>, ServiceError>;
}
