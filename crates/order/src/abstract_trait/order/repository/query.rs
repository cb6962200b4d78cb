use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::RepositoryError;
use uuid::Uuid;

use crate::cursor::PageCursor;
use crate::model::{Order, OrderStatus};

pub type DynOrderQueryRepository = Arc<dyn OrderQueryRepositoryTrait + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ListOrdersQuery {
    pub user_id: String,
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub cursor: Option<PageCursor>,
}

#[async_trait]
pub trait OrderQueryRepositoryTrait {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepositoryError>;

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    // Returns up to limit + 1 rows so the caller can detect another page.
    async fn list(&self, query: &ListOrdersQuery) -> Result<Vec<Order>, RepositoryError>;
}
