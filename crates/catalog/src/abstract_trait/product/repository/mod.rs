use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::RepositoryError;
use uuid::Uuid;

use crate::model::{NewProduct, Product, ProductPatch};

pub type DynProductCommandRepository = Arc<dyn ProductCommandRepositoryTrait + Send + Sync>;
pub type DynProductQueryRepository = Arc<dyn ProductQueryRepositoryTrait + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct ListProductsQuery {
    pub limit: i64,
    pub cursor: Option<Uuid>,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[async_trait]
pub trait ProductCommandRepositoryTrait {
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    async fn update(&self, patch: &ProductPatch) -> Result<Product, RepositoryError>;

    async fn update_stock(&self, product_id: Uuid, delta: i32) -> Result<i32, RepositoryError>;
}

#[async_trait]
pub trait ProductQueryRepositoryTrait {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, RepositoryError>;

    async fn list(&self, query: &ListProductsQuery) -> Result<Vec<Product>, RepositoryError>;

    // Fresh read from the source of truth; never served from cache.
    async fn available_quantities(
        &self,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i32>, RepositoryError>;
}
