use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prometheus_client::registry::Registry;
use shared::cache::CacheStore;
use shared::errors::{RepositoryError, ServiceError};
use shared::utils::{Method, Metrics, Status};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::abstract_trait::product::repository::{
    DynProductQueryRepository, ListProductsQuery,
};
use crate::abstract_trait::product::service::ProductQueryServiceTrait;
use crate::domain::requests::{AvailabilityItem, ListProductsRequest};
use crate::domain::response::{ProductPageResponse, ProductResponse};
use crate::model::UnavailableItem;
use crate::service::product::{PRODUCT_CACHE_PREFIX, list_cache_key};

const DEFAULT_LIMIT: i32 = 20;
const MAX_LIMIT: i32 = 100;

#[derive(Clone)]
pub struct ProductQueryService {
    query: DynProductQueryRepository,
    cache: Arc<CacheStore>,
    product_ttl: Duration,
    list_ttl: Duration,
    metrics: Metrics,
}

impl ProductQueryService {
    pub fn new(
        query: DynProductQueryRepository,
        cache: Arc<CacheStore>,
        product_ttl: Duration,
        list_ttl: Duration,
        registry: &mut Registry,
    ) -> Self {
        let metrics = Metrics::new();
        metrics.register("product_query_service", registry);

        Self {
            query,
            cache,
            product_ttl,
            list_ttl,
            metrics,
        }
    }
}

#[async_trait]
impl ProductQueryServiceTrait for ProductQueryService {
    async fn get_product(&self, id: Uuid) -> Result<ProductResponse, ServiceError> {
        let started = Instant::now();
        let cache_key = format!("{PRODUCT_CACHE_PREFIX}{id}");

        if let Some(cached) = self
            .cache
            .get_from_cache::<ProductResponse>(&cache_key)
            .await
        {
            info!("✅ Found product {} in cache", id);
            self.metrics
                .record(Method::Get, Status::Success, started.elapsed().as_secs_f64());
            return Ok(cached);
        }

        let product = self
            .query
            .find_by_id(id)
            .await
            .map_err(ServiceError::Repo)?
            .ok_or(ServiceError::Repo(RepositoryError::NotFound))?;

        let response = ProductResponse::from(product);
        self.cache
            .set_to_cache(&cache_key, &response, self.product_ttl)
            .await;

        self.metrics
            .record(Method::Get, Status::Success, started.elapsed().as_secs_f64());
        Ok(response)
    }

    async fn list_products(
        &self,
        req: &ListProductsRequest,
    ) -> Result<ProductPageResponse, ServiceError> {
        let started = Instant::now();

        let limit = if req.limit <= 0 {
            DEFAULT_LIMIT
        } else {
            req.limit.min(MAX_LIMIT)
        } as i64;

        let cursor = req
            .cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| ServiceError::Validation(vec!["malformed cursor".to_string()]))?;

        let cache_key = list_cache_key(
            limit,
            req.cursor.as_deref(),
            req.category.as_deref(),
            req.search.as_deref(),
        );

        if let Some(cached) = self
            .cache
            .get_from_cache::<ProductPageResponse>(&cache_key)
            .await
        {
            info!("✅ Found {} products in list cache", cached.products.len());
            self.metrics
                .record(Method::Get, Status::Success, started.elapsed().as_secs_f64());
            return Ok(cached);
        }

        let mut products = self
            .query
            .list(&ListProductsQuery {
                limit,
                cursor,
                category: req.category.clone().filter(|c| !c.is_empty()),
                search: req.search.clone().filter(|s| !s.is_empty()),
            })
            .await
            .map_err(ServiceError::Repo)?;

        let has_more = products.len() as i64 > limit;
        if has_more {
            products.truncate(limit as usize);
        }
        let next_cursor = if has_more {
            products.last().map(|p| p.id.to_string())
        } else {
            None
        };

        let response = ProductPageResponse {
            products: products.into_iter().map(ProductResponse::from).collect(),
            next_cursor,
            has_more,
        };

        self.cache
            .set_to_cache(&cache_key, &response, self.list_ttl)
            .await;

        info!("✅ Found {} products", response.products.len());
        self.metrics
            .record(Method::Get, Status::Success, started.elapsed().as_secs_f64());
        Ok(response)
    }

    async fn check_availability(
        &self,
        items: &[AvailabilityItem],
    ) -> Result<Vec<UnavailableItem>, ServiceError> {
        let ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();

        // Availability backs reservation decisions, so it always bypasses
        // the cache.
        let available = self
            .query
            .available_quantities(&ids)
            .await
            .map_err(ServiceError::Repo)?;

        let mut unavailable = Vec::new();
        for item in items {
            let in_stock = available.get(&item.product_id).copied().unwrap_or(0);
            if in_stock < item.quantity {
                unavailable.push(UnavailableItem {
                    product_id: item.product_id.to_string(),
                    requested: item.quantity,
                    available: in_stock,
                });
            }
        }

        Ok(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use shared::cache::InMemoryCacheBackend;

    use super::*;
    use crate::service::product::testing::{FailingCacheBackend, FakeProductRepository};

    fn service_with_cache(
        repo: Arc<FakeProductRepository>,
        cache: Arc<CacheStore>,
    ) -> ProductQueryService {
        let mut registry = Registry::default();
        ProductQueryService::new(
            repo,
            cache,
            Duration::from_secs(300),
            Duration::from_secs(120),
            &mut registry,
        )
    }

    fn service(repo: Arc<FakeProductRepository>) -> ProductQueryService {
        service_with_cache(
            repo,
            Arc::new(CacheStore::new(Arc::new(InMemoryCacheBackend::new()))),
        )
    }

    #[tokio::test]
    async fn read_through_hits_the_repository_once() {
        let repo = Arc::new(FakeProductRepository::default());
        let id = repo.seed("Mug", 10).await;
        let service = service(repo.clone());

        let first = service.get_product(id).await.unwrap();
        let second = service.get_product(id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.find_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cached_product_expires_after_its_ttl() {
        let repo = Arc::new(FakeProductRepository::default());
        let id = repo.seed("Mug", 10).await;
        let service = service(repo.clone());

        service.get_product(id).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        service.get_product(id).await.unwrap();

        assert_eq!(repo.find_calls(), 2);
    }

    #[tokio::test]
    async fn cache_failure_degrades_to_direct_reads() {
        let repo = Arc::new(FakeProductRepository::default());
        let id = repo.seed("Mug", 10).await;
        let service = service_with_cache(
            repo.clone(),
            Arc::new(CacheStore::new(Arc::new(FailingCacheBackend))),
        );

        let product = service.get_product(id).await.unwrap();
        assert_eq!(product.name, "Mug");

        let listed = service
            .list_products(&ListProductsRequest {
                limit: 10,
                cursor: None,
                category: None,
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(listed.products.len(), 1);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let repo = Arc::new(FakeProductRepository::default());
        let service = service(repo);

        let err = service.get_product(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repo(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn availability_check_reports_shortfalls() {
        let repo = Arc::new(FakeProductRepository::default());
        let mug = repo.seed("Mug", 2).await;
        let plate = repo.seed("Plate", 10).await;
        let ghost = Uuid::new_v4();
        let service = service(repo);

        let unavailable = service
            .check_availability(&[
                AvailabilityItem {
                    product_id: mug,
                    quantity: 5,
                },
                AvailabilityItem {
                    product_id: plate,
                    quantity: 1,
                },
                AvailabilityItem {
                    product_id: ghost,
                    quantity: 1,
                },
            ])
            .await
            .unwrap();

        assert_eq!(unavailable.len(), 2);
        assert!(unavailable.iter().any(|u| u.product_id == mug.to_string()
            && u.requested == 5
            && u.available == 2));
        assert!(unavailable
            .iter()
            .any(|u| u.product_id == ghost.to_string() && u.available == 0));
    }
}
