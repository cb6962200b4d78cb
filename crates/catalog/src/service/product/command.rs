use std::sync::Arc;

use async_trait::async_trait;
use prometheus_client::registry::Registry;
use shared::cache::CacheStore;
use shared::errors::ServiceError;
use shared::utils::{Method, Metrics, Status};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::abstract_trait::product::repository::DynProductCommandRepository;
use crate::abstract_trait::product::service::ProductCommandServiceTrait;
use crate::domain::requests::{CreateProductRequest, UpdateProductRequest, UpdateStockRequest};
use crate::domain::response::ProductResponse;
use crate::model::{NewProduct, ProductPatch};
use crate::service::product::{LIST_CACHE_PREFIX, PRODUCT_CACHE_PREFIX};

#[derive(Clone)]
pub struct ProductCommandService {
    command: DynProductCommandRepository,
    cache: Arc<CacheStore>,
    metrics: Metrics,
}

impl ProductCommandService {
    pub fn new(
        command: DynProductCommandRepository,
        cache: Arc<CacheStore>,
        registry: &mut Registry,
    ) -> Self {
        let metrics = Metrics::new();
        metrics.register("product_command_service", registry);

        Self {
            command,
            cache,
            metrics,
        }
    }

    fn validation_errors(errors: &validator::ValidationErrors) -> ServiceError {
        ServiceError::Validation(
            errors
                .to_string()
                .lines()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect(),
        )
    }

    async fn invalidate_product(&self, id: Uuid) {
        self.cache
            .delete_from_cache(&format!("{PRODUCT_CACHE_PREFIX}{id}"))
            .await;
    }

    async fn invalidate_lists(&self) {
        self.cache.delete_by_prefix(LIST_CACHE_PREFIX).await;
    }
}

#[async_trait]
impl ProductCommandServiceTrait for ProductCommandService {
    async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        req.validate().map_err(|e| Self::validation_errors(&e))?;

        let started = Instant::now();

        let product = self
            .command
            .create(&NewProduct {
                id: Uuid::new_v4(),
                name: req.name.clone(),
                description: req.description.clone(),
                price_amount: req.price_amount,
                price_currency: req.price_currency.clone(),
                category: req.category.clone(),
                stock_quantity: req.stock_quantity,
            })
            .await
            .map_err(ServiceError::Repo)?;

        // New rows change every list page.
        self.invalidate_lists().await;

        info!("✅ Product created: '{}' ({})", product.name, product.id);
        self.metrics
            .record(Method::Post, Status::Success, started.elapsed().as_secs_f64());

        Ok(ProductResponse::from(product))
    }

    async fn update_product(
        &self,
        req: &UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        req.validate().map_err(|e| Self::validation_errors(&e))?;

        let started = Instant::now();

        let product = self
            .command
            .update(&ProductPatch {
                id: req.id,
                name: req.name.clone(),
                description: req.description.clone(),
                price_amount: req.price_amount,
                price_currency: req.price_currency.clone(),
                category: req.category.clone(),
            })
            .await
            .map_err(ServiceError::Repo)?;

        self.invalidate_product(req.id).await;
        self.invalidate_lists().await;

        info!("🔄 Product updated: {}", req.id);
        self.metrics
            .record(Method::Put, Status::Success, started.elapsed().as_secs_f64());

        Ok(ProductResponse::from(product))
    }

    async fn update_stock(&self, req: &UpdateStockRequest) -> Result<i32, ServiceError> {
        let started = Instant::now();

        let new_quantity = self
            .command
            .update_stock(req.product_id, req.delta)
            .await
            .map_err(ServiceError::Repo)?;

        self.invalidate_product(req.product_id).await;
        self.invalidate_lists().await;

        info!(
            "📦 Stock updated | product={} delta={} new={}",
            req.product_id, req.delta, new_quantity
        );
        self.metrics
            .record(Method::Put, Status::Success, started.elapsed().as_secs_f64());

        Ok(new_quantity)
    }
}

#[cfg(test)]
mod tests {
    use shared::cache::InMemoryCacheBackend;

    use super::*;
    use crate::abstract_trait::product::service::ProductQueryServiceTrait;
    use crate::domain::requests::ListProductsRequest;
    use crate::service::product::ProductQueryService;
    use crate::service::product::testing::FakeProductRepository;

    fn cache() -> Arc<CacheStore> {
        Arc::new(CacheStore::new(Arc::new(InMemoryCacheBackend::new())))
    }

    fn command_service(
        repo: Arc<FakeProductRepository>,
        cache: Arc<CacheStore>,
    ) -> ProductCommandService {
        let mut registry = Registry::default();
        ProductCommandService::new(repo, cache, &mut registry)
    }

    fn query_service(
        repo: Arc<FakeProductRepository>,
        cache: Arc<CacheStore>,
    ) -> ProductQueryService {
        let mut registry = Registry::default();
        ProductQueryService::new(
            repo,
            cache,
            std::time::Duration::from_secs(300),
            std::time::Duration::from_secs(120),
            &mut registry,
        )
    }

    fn create_request(name: &str) -> CreateProductRequest {
        CreateProductRequest {
            name: name.into(),
            description: "".into(),
            price_amount: 500,
            price_currency: "USD".into(),
            category: "mugs".into(),
            stock_quantity: 10,
        }
    }

    #[tokio::test]
    async fn rejects_invalid_products() {
        let repo = Arc::new(FakeProductRepository::default());
        let service = command_service(repo.clone(), cache());

        let mut bad = create_request("");
        bad.price_currency = "US".into();

        let err = service.create_product(&bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(repo.product_count().await, 0);
    }

    #[tokio::test]
    async fn update_invalidates_the_cached_product() {
        let repo = Arc::new(FakeProductRepository::default());
        let cache = cache();
        let commands = command_service(repo.clone(), cache.clone());
        let queries = query_service(repo.clone(), cache.clone());

        let created = commands.create_product(&create_request("Mug")).await.unwrap();

        // Warm the per-product cache.
        let first = queries.get_product(created.id).await.unwrap();
        assert_eq!(first.name, "Mug");
        assert_eq!(repo.find_calls(), 1);

        commands
            .update_product(&UpdateProductRequest {
                id: created.id,
                name: "Better Mug".into(),
                description: "".into(),
                price_amount: 600,
                price_currency: "USD".into(),
                category: "mugs".into(),
            })
            .await
            .unwrap();

        // The stale snapshot is gone; the next read goes to the repository.
        let fresh = queries.get_product(created.id).await.unwrap();
        assert_eq!(fresh.name, "Better Mug");
        assert_eq!(repo.find_calls(), 2);
    }

    #[tokio::test]
    async fn writes_purge_list_caches() {
        let repo = Arc::new(FakeProductRepository::default());
        let cache = cache();
        let commands = command_service(repo.clone(), cache.clone());
        let queries = query_service(repo.clone(), cache.clone());

        commands.create_product(&create_request("Mug")).await.unwrap();

        let request = ListProductsRequest {
            limit: 10,
            cursor: None,
            category: None,
            search: None,
        };

        // Warm the list cache, then mutate.
        queries.list_products(&request).await.unwrap();
        assert_eq!(repo.list_calls(), 1);
        queries.list_products(&request).await.unwrap();
        assert_eq!(repo.list_calls(), 1);

        commands.create_product(&create_request("Plate")).await.unwrap();

        let listed = queries.list_products(&request).await.unwrap();
        assert_eq!(repo.list_calls(), 2);
        assert_eq!(listed.products.len(), 2);
    }

    #[tokio::test]
    async fn update_stock_invalidates_and_returns_new_quantity() {
        let repo = Arc::new(FakeProductRepository::default());
        let cache = cache();
        let commands = command_service(repo.clone(), cache.clone());
        let queries = query_service(repo.clone(), cache.clone());

        let created = commands.create_product(&create_request("Mug")).await.unwrap();
        queries.get_product(created.id).await.unwrap();

        let new_quantity = commands
            .update_stock(&UpdateStockRequest {
                product_id: created.id,
                delta: -3,
            })
            .await
            .unwrap();
        assert_eq!(new_quantity, 7);

        let fresh = queries.get_product(created.id).await.unwrap();
        assert_eq!(fresh.stock_quantity, 7);
    }
}
