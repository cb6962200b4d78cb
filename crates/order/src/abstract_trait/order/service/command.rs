use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::ServiceError;

use crate::domain::requests::{CancelOrderRequest, CreateOrderRequest, UpdateOrderStatusRequest};
use crate::domain::response::OrderResponse;

pub type DynOrderCommandService = Arc<dyn OrderCommandServiceTrait + Send + Sync>;

#[async_trait]
pub trait OrderCommandServiceTrait {
    async fn create_order(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<(OrderResponse, bool), ServiceError>;

    async fn cancel_order(&self, req: &CancelOrderRequest) -> Result<OrderResponse, ServiceError>;

    async fn update_order_status(
        &self,
        req: &UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError>;
}
