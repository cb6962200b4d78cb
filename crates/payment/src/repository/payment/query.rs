use async_trait::async_trait;
use shared::config::ConnectionPool;
use shared::errors::RepositoryError;
use tracing::error;
use uuid::Uuid;

use crate::abstract_trait::payment::repository::PaymentQueryRepositoryTrait;
use crate::model::Payment;

pub struct PaymentQueryRepository {
    db: ConnectionPool,
}

impl PaymentQueryRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentQueryRepositoryTrait for PaymentQueryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, RepositoryError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch payment {}: {:?}", id, e);
                RepositoryError::from(e)
            })
    }
}
