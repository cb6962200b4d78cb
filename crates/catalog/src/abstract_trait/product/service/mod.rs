use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::ServiceError;
use uuid::Uuid;

use crate::domain::requests::{
    AvailabilityItem, CreateProductRequest, ListProductsRequest, UpdateProductRequest,
    UpdateStockRequest,
};
use crate::domain::response::{ProductPageResponse, ProductResponse};
use crate::model::UnavailableItem;

pub type DynProductCommandService = Arc<dyn ProductCommandServiceTrait + Send + Sync>;
pub type DynProductQueryService = Arc<dyn ProductQueryServiceTrait + Send + Sync>;

#[async_trait]
pub trait ProductCommandServiceTrait {
    async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError>;

    async fn update_product(
        &self,
        req: &UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError>;

    async fn update_stock(&self, req: &UpdateStockRequest) -> Result<i32, ServiceError>;
}

#[async_trait]
pub trait ProductQueryServiceTrait {
    async fn get_product(&self, id: Uuid) -> Result<ProductResponse, ServiceError>;

    async fn list_products(
        &self,
        req: &ListProductsRequest,
    ) -> Result<ProductPageResponse, ServiceError>;

    async fn check_availability(
        &self,
        items: &[AvailabilityItem],
    ) -> Result<Vec<UnavailableItem>, ServiceError>;
}
