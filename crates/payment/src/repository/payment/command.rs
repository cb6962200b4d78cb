use async_trait::async_trait;
use shared::config::ConnectionPool;
use shared::errors::RepositoryError;
use shared::outbox::{NewOutboxEvent, OutboxStore};
use tracing::{error, info};
use uuid::Uuid;

use crate::abstract_trait::payment::repository::PaymentCommandRepositoryTrait;
use crate::model::{NewPayment, Payment, PaymentStatus};

pub struct PaymentCommandRepository {
    db: ConnectionPool,
    outbox: OutboxStore,
}

impl PaymentCommandRepository {
    pub fn new(db: ConnectionPool, outbox: OutboxStore) -> Self {
        Self { db, outbox }
    }
}

#[async_trait]
impl PaymentCommandRepositoryTrait for PaymentCommandRepository {
    async fn create(&self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        let created = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (id, order_id, user_id, amount, currency, status, method)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(&payment.order_id)
        .bind(&payment.user_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.method)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            error!(
                "❌ Failed to create payment for order {}: {:?}",
                payment.order_id, e
            );
            RepositoryError::from(e)
        })?;

        info!(
            "✅ Payment created | id={} order={}",
            created.id, created.order_id
        );
        Ok(created)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        let updated = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(next)
        .bind(id)
        .bind(expected)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| {
            error!("❌ Failed to transition payment {}: {:?}", id, e);
            RepositoryError::from(e)
        })?;

        match updated {
            Some(payment) => Ok(payment),
            None => {
                let exists =
                    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments WHERE id = $1")
                        .bind(id)
                        .fetch_one(&self.db)
                        .await
                        .map_err(RepositoryError::from)?;

                if exists == 0 {
                    Err(RepositoryError::NotFound)
                } else {
                    Err(RepositoryError::Conflict(format!(
                        "payment {id} is no longer in status {expected}"
                    )))
                }
            }
        }
    }

    async fn record_outcome(
        &self,
        id: Uuid,
        status: PaymentStatus,
        transaction_id: Option<&str>,
        error_message: Option<&str>,
        event: &NewOutboxEvent,
    ) -> Result<Payment, RepositoryError> {
        let mut tx = self.db.begin().await.map_err(RepositoryError::from)?;

        let updated = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $1,
                provider_transaction_id = COALESCE($2, provider_transaction_id),
                error_message = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(transaction_id)
        .bind(error_message)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("❌ Failed to record payment {} outcome: {:?}", id, e);
            RepositoryError::from(e)
        })?
        .ok_or(RepositoryError::NotFound)?;

        self.outbox.insert_in_tx(&mut tx, event).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!("💳 Payment {} recorded as {}", id, status);
        Ok(updated)
    }
}
