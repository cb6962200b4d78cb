use async_trait::async_trait;
use shared::config::ConnectionPool;
use shared::errors::RepositoryError;
use sqlx::QueryBuilder;
use tracing::error;
use uuid::Uuid;

use crate::abstract_trait::order::repository::{ListOrdersQuery, OrderQueryRepositoryTrait};
use crate::model::{Order, OrderItem};

pub struct OrderQueryRepository {
    db: ConnectionPool,
}

impl OrderQueryRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }

    async fn load_items(&self, order: &mut Order) -> Result<(), RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT * FROM order_items
            WHERE order_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(order.id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| {
            error!("❌ Failed to load items for order {}: {:?}", order.id, e);
            RepositoryError::from(e)
        })?;

        order.items = items;
        Ok(())
    }
}

#[async_trait]
impl OrderQueryRepositoryTrait for OrderQueryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch order {}: {:?}", id, e);
                RepositoryError::from(e)
            })?;

        match order {
            Some(mut order) => {
                self.load_items(&mut order).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 AND idempotency_key = $2",
        )
        .bind(user_id)
        .bind(idempotency_key)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| {
            error!(
                "❌ Failed to fetch order by idempotency key for user {}: {:?}",
                user_id, e
            );
            RepositoryError::from(e)
        })?;

        match order {
            Some(mut order) => {
                self.load_items(&mut order).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, query: &ListOrdersQuery) -> Result<Vec<Order>, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE user_id = ");
        builder.push_bind(&query.user_id);

        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }

        if let Some(cursor) = &query.cursor {
            builder.push(" AND (created_at, id) < (");
            builder.push_bind(cursor.created_at);
            builder.push(", ");
            builder.push_bind(cursor.id);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(query.limit + 1);

        let mut orders = builder
            .build_query_as::<Order>()
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to list orders for {}: {:?}", query.user_id, e);
                RepositoryError::from(e)
            })?;

        for order in orders.iter_mut() {
            self.load_items(order).await?;
        }

        Ok(orders)
    }
}
