use async_trait::async_trait;
use prometheus_client::registry::Registry;
use shared::errors::{RepositoryError, ServiceError};
use shared::utils::{Method, Metrics, Status};
use tokio::time::Instant;
use tracing::info;

use crate::abstract_trait::inventory::repository::DynInventoryQueryRepository;
use crate::abstract_trait::inventory::service::InventoryQueryServiceTrait;
use crate::domain::response::{InventoryResponse, ReservationResponse};

#[derive(Clone)]
pub struct InventoryQueryService {
    query: DynInventoryQueryRepository,
    metrics: Metrics,
}

impl InventoryQueryService {
    pub fn new(query: DynInventoryQueryRepository, registry: &mut Registry) -> Self {
        let metrics = Metrics::new();
        metrics.register("inventory_query_service", registry);

        Self { query, metrics }
    }
}

#[async_trait]
impl InventoryQueryServiceTrait for InventoryQueryService {
    async fn get_inventory(&self, product_id: &str) -> Result<InventoryResponse, ServiceError> {
        info!("🔍 Fetching inventory for product {product_id}");
        let started = Instant::now();

        let result = self
            .query
            .find_by_product(product_id)
            .await
            .map_err(ServiceError::Repo)?
            .map(InventoryResponse::from)
            .ok_or(ServiceError::Repo(RepositoryError::NotFound));

        let status = if result.is_ok() {
            Status::Success
        } else {
            Status::Error
        };
        self.metrics
            .record(Method::Get, status, started.elapsed().as_secs_f64());

        result
    }

    async fn get_reservations(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<ReservationResponse>, ServiceError> {
        let reservations = self
            .query
            .find_reservations(reservation_id)
            .await
            .map_err(ServiceError::Repo)?;

        Ok(reservations
            .into_iter()
            .map(ReservationResponse::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::inventory::testing::FakeInventoryRepository;

    #[tokio::test]
    async fn returns_row_or_not_found() {
        let repo = Arc::new(FakeInventoryRepository::default());
        repo.seed("p1", 4).await;

        let mut registry = Registry::default();
        let service = InventoryQueryService::new(repo, &mut registry);

        let row = service.get_inventory("p1").await.unwrap();
        assert_eq!(row.available_quantity, 4);

        let err = service.get_inventory("p2").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repo(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn lists_reservations_for_an_id() {
        use crate::abstract_trait::inventory::repository::InventoryCommandRepositoryTrait;
        use crate::model::ReservationItem;

        let repo = Arc::new(FakeInventoryRepository::default());
        repo.seed("p1", 4).await;
        repo.reserve(
            "r1",
            &[ReservationItem {
                product_id: "p1".into(),
                quantity: 2,
            }],
            900,
        )
        .await
        .unwrap();

        let mut registry = Registry::default();
        let service = InventoryQueryService::new(repo, &mut registry);

        let reservations = service.get_reservations("r1").await.unwrap();
        assert_eq!(reservations.len(), 1);
        assert_eq!(reservations[0].status, "active");
        assert_eq!(reservations[0].quantity, 2);

        assert!(service.get_reservations("r2").await.unwrap().is_empty());
    }
}
