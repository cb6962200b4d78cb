use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::RepositoryError;
use shared::outbox::NewOutboxEvent;
use uuid::Uuid;

use crate::model::{NewOrder, Order, OrderStatus};

pub type DynOrderCommandRepository = Arc<dyn OrderCommandRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait OrderCommandRepositoryTrait {
    async fn create_with_outbox(
        &self,
        order: &NewOrder,
        event: &NewOutboxEvent,
    ) -> Result<Order, RepositoryError>;

    async fn update_status_with_outbox(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        event: &NewOutboxEvent,
    ) -> Result<Order, RepositoryError>;
}
