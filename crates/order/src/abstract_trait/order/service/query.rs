use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::ServiceError;
use uuid::Uuid;

use crate::domain::requests::ListOrdersRequest;
use crate::domain::response::{OrderPageResponse, OrderResponse};

pub type DynOrderQueryService = Arc<dyn OrderQueryServiceTrait + Send + Sync>;

#[async_trait]
pub trait OrderQueryServiceTrait {
    async fn get_order(&self, id: Uuid) -> Result<OrderResponse, ServiceError>;

    async fn list_orders(&self, req: &ListOrdersRequest) -> Result<OrderPageResponse, ServiceError>;
}
