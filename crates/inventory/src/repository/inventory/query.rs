use async_trait::async_trait;
use shared::config::ConnectionPool;
use shared::errors::RepositoryError;
use tracing::error;

use crate::abstract_trait::inventory::repository::InventoryQueryRepositoryTrait;
use crate::model::{InventoryRow, Reservation};

pub struct InventoryQueryRepository {
    db: ConnectionPool,
}

impl InventoryQueryRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InventoryQueryRepositoryTrait for InventoryQueryRepository {
    async fn find_by_product(
        &self,
        product_id: &str,
    ) -> Result<Option<InventoryRow>, RepositoryError> {
        sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT product_id, available_quantity, reserved_quantity, total_quantity, version, updated_at
            FROM inventory
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| {
            error!("❌ Failed to fetch inventory for {}: {:?}", product_id, e);
            RepositoryError::from(e)
        })
    }

    async fn find_reservations(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, reservation_id, product_id, quantity, status, expires_at, created_at, updated_at
            FROM reservations
            WHERE reservation_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| {
            error!(
                "❌ Failed to fetch reservations for {}: {:?}",
                reservation_id, e
            );
            RepositoryError::from(e)
        })
    }
}
