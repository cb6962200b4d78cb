use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tracing::error;
use uuid::Uuid;

use crate::config::ConnectionPool;
use crate::errors::RepositoryError;
use crate::outbox::{NewOutboxEvent, OutboxEvent};

#[async_trait]
pub trait OutboxSourceTrait {
    async fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEvent>, RepositoryError>;

    async fn mark_published(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// Data access for one outbox table. The table name is fixed at construction
/// (`outbox` for orders, `payment_outbox` for payments); aggregate writers
/// append rows inside their own transactions, the dispatcher reads and marks.
#[derive(Clone)]
pub struct OutboxStore {
    db: ConnectionPool,
    table: &'static str,
}

impl OutboxStore {
    pub fn new(db: ConnectionPool, table: &'static str) -> Self {
        Self { db, table }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub async fn insert_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: &NewOutboxEvent,
    ) -> Result<(), RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO {} (id, aggregate_type, aggregate_id, event_type, payload)
            VALUES ($1, $2, $3, $4, $5)
            "#,
            self.table
        );

        sqlx::query(&query)
            .bind(event.id)
            .bind(&event.aggregate_type)
            .bind(&event.aggregate_id)
            .bind(&event.event_type)
            .bind(&event.payload)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                error!("❌ Failed to insert outbox event {}: {:?}", event.id, e);
                RepositoryError::from(e)
            })?;

        Ok(())
    }
}

#[async_trait]
impl OutboxSourceTrait for OutboxStore {
    async fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEvent>, RepositoryError> {
        let query = format!(
            r#"
            SELECT id, aggregate_type, aggregate_id, event_type, payload, published, published_at, created_at
            FROM {}
            WHERE NOT published
            ORDER BY created_at
            LIMIT $1
            "#,
            self.table
        );

        let events = sqlx::query_as::<_, OutboxEvent>(&query)
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch unpublished events: {:?}", e);
                RepositoryError::from(e)
            })?;

        Ok(events)
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), RepositoryError> {
        let query = format!(
            r#"
            UPDATE {}
            SET published = true, published_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND NOT published
            "#,
            self.table
        );

        // Zero rows means a racing dispatcher already marked it; that is fine.
        sqlx::query(&query)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to mark event {} published: {:?}", id, e);
                RepositoryError::from(e)
            })?;

        Ok(())
    }
}
