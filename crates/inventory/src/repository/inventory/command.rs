use async_trait::async_trait;
use chrono::{Duration, Utc};
use shared::config::ConnectionPool;
use shared::errors::RepositoryError;
use tracing::{error, info};
use uuid::Uuid;

use crate::abstract_trait::inventory::repository::InventoryCommandRepositoryTrait;
use crate::model::{InventoryRow, ReservationItem, ReservationStatus};

enum Finalize {
    Commit,
    Release,
}

pub struct InventoryCommandRepository {
    db: ConnectionPool,
}

impl InventoryCommandRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }

    async fn finalize(
        &self,
        reservation_id: &str,
        mode: Finalize,
    ) -> Result<Vec<ReservationItem>, RepositoryError> {
        let mut tx = self.db.begin().await.map_err(RepositoryError::from)?;

        let items = sqlx::query_as::<_, ReservationItem>(
            r#"
            SELECT product_id, quantity
            FROM reservations
            WHERE reservation_id = $1 AND status = 'active'
            FOR UPDATE
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            error!("❌ Failed to load reservations for {}: {:?}", reservation_id, e);
            RepositoryError::from(e)
        })?;

        if items.is_empty() {
            return Err(RepositoryError::NotFound);
        }

        let (inventory_update, status) = match mode {
            Finalize::Commit => (
                // Sold goods leave the system entirely.
                r#"
                UPDATE inventory
                SET reserved_quantity = reserved_quantity - $1,
                    total_quantity = total_quantity - $1,
                    version = version + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE product_id = $2
                "#,
                ReservationStatus::Committed,
            ),
            Finalize::Release => (
                r#"
                UPDATE inventory
                SET available_quantity = available_quantity + $1,
                    reserved_quantity = reserved_quantity - $1,
                    version = version + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE product_id = $2
                "#,
                ReservationStatus::Released,
            ),
        };

        for item in &items {
            sqlx::query(inventory_update)
                .bind(item.quantity)
                .bind(&item.product_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!(
                        "❌ Failed to update inventory for {}: {:?}",
                        item.product_id, e
                    );
                    RepositoryError::from(e)
                })?;
        }

        sqlx::query(
            r#"
            UPDATE reservations
            SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE reservation_id = $2 AND status = 'active'
            "#,
        )
        .bind(status)
        .bind(reservation_id)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            "✅ Reservation {} finalized as {:?} ({} items)",
            reservation_id,
            status,
            items.len()
        );
        Ok(items)
    }
}

#[async_trait]
impl InventoryCommandRepositoryTrait for InventoryCommandRepository {
    async fn reserve(
        &self,
        reservation_id: &str,
        items: &[ReservationItem],
        ttl_seconds: i64,
    ) -> Result<(), RepositoryError> {
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);

        let mut tx = self.db.begin().await.map_err(RepositoryError::from)?;

        for item in items {
            let row = sqlx::query_as::<_, InventoryRow>(
                r#"
                SELECT product_id, available_quantity, reserved_quantity, total_quantity, version, updated_at
                FROM inventory
                WHERE product_id = $1
                FOR UPDATE
                "#,
            )
            .bind(&item.product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from)?
            .ok_or_else(|| {
                RepositoryError::Custom(format!(
                    "product {} not found in inventory",
                    item.product_id
                ))
            })?;

            if row.available_quantity < item.quantity {
                return Err(RepositoryError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    available: row.available_quantity,
                    requested: item.quantity,
                });
            }

            let affected = sqlx::query(
                r#"
                UPDATE inventory
                SET available_quantity = available_quantity - $1,
                    reserved_quantity = reserved_quantity + $1,
                    version = version + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE product_id = $2 AND version = $3
                "#,
            )
            .bind(item.quantity)
            .bind(&item.product_id)
            .bind(row.version)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?
            .rows_affected();

            if affected == 0 {
                return Err(RepositoryError::Conflict(format!(
                    "inventory conflict for product {} (concurrent update)",
                    item.product_id
                )));
            }

            sqlx::query(
                r#"
                INSERT INTO reservations (id, reservation_id, product_id, quantity, status, expires_at)
                VALUES ($1, $2, $3, $4, 'active', $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(reservation_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(expires_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let repo_err = RepositoryError::from(e);
                if repo_err.is_unique_violation() {
                    RepositoryError::AlreadyExists(format!(
                        "reservation {} already holds product {}",
                        reservation_id, item.product_id
                    ))
                } else {
                    error!("❌ Failed to create reservation: {:?}", repo_err);
                    repo_err
                }
            })?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            "✅ Stock reserved | reservation={} items={}",
            reservation_id,
            items.len()
        );
        Ok(())
    }

    async fn commit(&self, reservation_id: &str) -> Result<Vec<ReservationItem>, RepositoryError> {
        self.finalize(reservation_id, Finalize::Commit).await
    }

    async fn release(&self, reservation_id: &str) -> Result<Vec<ReservationItem>, RepositoryError> {
        self.finalize(reservation_id, Finalize::Release).await
    }

    async fn adjust(&self, product_id: &str, delta: i32) -> Result<InventoryRow, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryRow>(
            r#"
            INSERT INTO inventory (product_id, available_quantity, total_quantity)
            VALUES ($1, $2, $2)
            ON CONFLICT (product_id) DO UPDATE
            SET available_quantity = inventory.available_quantity + $2,
                total_quantity = inventory.total_quantity + $2,
                version = inventory.version + 1,
                updated_at = CURRENT_TIMESTAMP
            RETURNING product_id, available_quantity, reserved_quantity, total_quantity, version, updated_at
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            error!("❌ Failed to adjust inventory for {}: {:?}", product_id, e);
            RepositoryError::from(e)
        })?;

        Ok(row)
    }

    async fn reap_expired(&self) -> Result<i64, RepositoryError> {
        let released = sqlx::query_scalar::<_, i32>("SELECT release_expired_reservations()")
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to reap expired reservations: {:?}", e);
                RepositoryError::from(e)
            })?;

        Ok(released as i64)
    }
}
