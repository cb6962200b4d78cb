use async_trait::async_trait;
use shared::config::ConnectionPool;
use shared::errors::RepositoryError;
use shared::outbox::{NewOutboxEvent, OutboxStore};
use tracing::{error, info};
use uuid::Uuid;

use crate::abstract_trait::order::repository::OrderCommandRepositoryTrait;
use crate::model::{NewOrder, Order, OrderStatus};

pub struct OrderCommandRepository {
    db: ConnectionPool,
    outbox: OutboxStore,
}

impl OrderCommandRepository {
    pub fn new(db: ConnectionPool, outbox: OutboxStore) -> Self {
        Self { db, outbox }
    }
}

#[async_trait]
impl OrderCommandRepositoryTrait for OrderCommandRepository {
    async fn create_with_outbox(
        &self,
        order: &NewOrder,
        event: &NewOutboxEvent,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.db.begin().await.map_err(RepositoryError::from)?;

        let mut created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, user_id, idempotency_key, total_amount, total_currency, status,
                                shipping_street, shipping_city, shipping_state, shipping_postal_code, shipping_country)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(&order.user_id)
        .bind(&order.idempotency_key)
        .bind(order.total_amount)
        .bind(&order.total_currency)
        .bind(order.status)
        .bind(&order.shipping_street)
        .bind(&order.shipping_city)
        .bind(&order.shipping_state)
        .bind(&order.shipping_postal_code)
        .bind(&order.shipping_country)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| {
            let repo_err = RepositoryError::from(err);
            if repo_err.is_unique_violation() {
                info!(
                    "🔁 Duplicate idempotency key for user {}, deferring to existing order",
                    order.user_id
                );
                RepositoryError::AlreadyExists(format!(
                    "order already exists for idempotency key {}",
                    order.idempotency_key
                ))
            } else {
                error!(
                    "❌ Failed to create order for user {}: {:?}",
                    order.user_id, repo_err
                );
                repo_err
            }
        })?;

        for item in &order.items {
            let inserted = sqlx::query_as::<_, crate::model::OrderItem>(
                r#"
                INSERT INTO order_items (id, order_id, product_id, product_name, quantity,
                                         unit_price_amount, unit_price_currency,
                                         total_price_amount, total_price_currency)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(item.id)
            .bind(created.id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price_amount)
            .bind(&item.unit_price_currency)
            .bind(item.total_price_amount)
            .bind(&item.total_price_currency)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!("❌ Failed to insert order item: {:?}", e);
                RepositoryError::from(e)
            })?;

            created.items.push(inserted);
        }

        self.outbox.insert_in_tx(&mut tx, event).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            "✅ Created order {} for user {} (total {} {})",
            created.id, created.user_id, created.total_amount, created.total_currency
        );
        Ok(created)
    }

    async fn update_status_with_outbox(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        event: &NewOutboxEvent,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.db.begin().await.map_err(RepositoryError::from)?;

        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(next)
        .bind(order_id)
        .bind(expected)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("❌ Failed to update order {} status: {:?}", order_id, e);
            RepositoryError::from(e)
        })?;

        let updated = match updated {
            Some(order) => order,
            None => {
                // Distinguish a missing order from a lost transition race.
                let exists = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM orders WHERE id = $1",
                )
                .bind(order_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;

                return if exists == 0 {
                    Err(RepositoryError::NotFound)
                } else {
                    Err(RepositoryError::Conflict(format!(
                        "order {order_id} is no longer in status {expected}"
                    )))
                };
            }
        };

        self.outbox.insert_in_tx(&mut tx, event).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!("🔄 Order {} transitioned {} -> {}", order_id, expected, next);
        Ok(updated)
    }
}
