use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::RepositoryError;

use crate::model::{InventoryRow, Reservation, ReservationItem};

pub type DynInventoryCommandRepository = Arc<dyn InventoryCommandRepositoryTrait + Send + Sync>;
pub type DynInventoryQueryRepository = Arc<dyn InventoryQueryRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait InventoryCommandRepositoryTrait {
    // All-or-nothing multi-item reserve; a version mismatch aborts the
    // whole transaction with a conflict.
    async fn reserve(
        &self,
        reservation_id: &str,
        items: &[ReservationItem],
        ttl_seconds: i64,
    ) -> Result<(), RepositoryError>;

    // Sold goods leave the system: reserved and total both shrink.
    async fn commit(&self, reservation_id: &str) -> Result<Vec<ReservationItem>, RepositoryError>;

    async fn release(&self, reservation_id: &str) -> Result<Vec<ReservationItem>, RepositoryError>;

    async fn adjust(&self, product_id: &str, delta: i32) -> Result<InventoryRow, RepositoryError>;

    // Releases every active reservation past its expiry; returns how many.
    async fn reap_expired(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait InventoryQueryRepositoryTrait {
    async fn find_by_product(
        &self,
        product_id: &str,
    ) -> Result<Option<InventoryRow>, RepositoryError>;

    async fn find_reservations(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<Reservation>, RepositoryError>;
}
