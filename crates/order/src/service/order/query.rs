use async_trait::async_trait;
use prometheus_client::registry::Registry;
use shared::errors::{RepositoryError, ServiceError};
use shared::utils::{Method, Metrics, Status};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::abstract_trait::order::repository::{DynOrderQueryRepository, ListOrdersQuery};
use crate::abstract_trait::order::service::OrderQueryServiceTrait;
use crate::cursor::PageCursor;
use crate::domain::requests::ListOrdersRequest;
use crate::domain::response::{OrderPageResponse, OrderResponse};
use crate::model::OrderStatus;

const DEFAULT_PAGE_SIZE: i32 = 20;
const MAX_PAGE_SIZE: i32 = 100;

#[derive(Clone)]
pub struct OrderQueryService {
    query: DynOrderQueryRepository,
    metrics: Metrics,
}

impl OrderQueryService {
    pub fn new(query: DynOrderQueryRepository, registry: &mut Registry) -> Self {
        let metrics = Metrics::new();
        metrics.register("order_query_service", registry);

        Self { query, metrics }
    }
}

#[async_trait]
impl OrderQueryServiceTrait for OrderQueryService {
    async fn get_order(&self, id: Uuid) -> Result<OrderResponse, ServiceError> {
        info!("🆔 Finding order by ID: {id}");
        let started = Instant::now();

        let order = self
            .query
            .find_by_id(id)
            .await
            .map_err(ServiceError::Repo)?;

        let result = match order {
            Some(order) => Ok(OrderResponse::from(order)),
            None => Err(ServiceError::Repo(RepositoryError::NotFound)),
        };

        let status = if result.is_ok() {
            Status::Success
        } else {
            Status::Error
        };
        self.metrics
            .record(Method::Get, status, started.elapsed().as_secs_f64());

        result
    }

    async fn list_orders(&self, req: &ListOrdersRequest) -> Result<OrderPageResponse, ServiceError> {
        info!(
            "🔍 Listing orders | user={} page_size={}",
            req.user_id, req.page_size
        );
        let started = Instant::now();

        let limit = if req.page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            req.page_size.min(MAX_PAGE_SIZE)
        } as i64;

        let status = req
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(|e| ServiceError::Validation(vec![e]))?;

        let cursor = req
            .cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(PageCursor::decode)
            .transpose()
            .map_err(|e| ServiceError::Validation(vec![e]))?;

        let mut orders = self
            .query
            .list(&ListOrdersQuery {
                user_id: req.user_id.clone(),
                status,
                limit,
                cursor,
            })
            .await
            .map_err(ServiceError::Repo)?;

        let has_more = orders.len() as i64 > limit;
        if has_more {
            orders.truncate(limit as usize);
        }

        let next_cursor = if has_more {
            orders.last().map(|order| {
                PageCursor {
                    created_at: order.created_at,
                    id: order.id,
                }
                .encode()
            })
        } else {
            None
        };

        let response = OrderPageResponse {
            orders: orders.into_iter().map(OrderResponse::from).collect(),
            next_cursor,
            has_more,
        };

        info!("✅ Found {} orders for {}", response.orders.len(), req.user_id);
        self.metrics
            .record(Method::Get, Status::Success, started.elapsed().as_secs_f64());

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::order::testing::FakeOrderRepository;

    fn service(repo: Arc<FakeOrderRepository>) -> OrderQueryService {
        let mut registry = Registry::default();
        OrderQueryService::new(repo, &mut registry)
    }

    fn list_request(page_size: i32, cursor: Option<String>) -> ListOrdersRequest {
        ListOrdersRequest {
            user_id: "u1".into(),
            status: None,
            page_size,
            cursor,
        }
    }

    #[tokio::test]
    async fn get_order_surfaces_not_found() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo);

        let err = service.get_order(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repo(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn pages_do_not_overlap_and_stay_stable_under_insert() {
        let repo = Arc::new(FakeOrderRepository::default());
        for age in 1..=5 {
            repo.seed_order_at("u1", OrderStatus::Pending, age * 10).await;
        }
        let service = service(repo.clone());

        let first = service.list_orders(&list_request(2, None)).await.unwrap();
        assert_eq!(first.orders.len(), 2);
        assert!(first.has_more);
        let cursor = first.next_cursor.clone().unwrap();

        // A fresh insert lands before the cursor and must not shift page two.
        repo.seed_order_at("u1", OrderStatus::Pending, 0).await;

        let second = service
            .list_orders(&list_request(2, Some(cursor)))
            .await
            .unwrap();
        assert_eq!(second.orders.len(), 2);

        let first_ids: Vec<Uuid> = first.orders.iter().map(|o| o.id).collect();
        for order in &second.orders {
            assert!(!first_ids.contains(&order.id));
            assert!(
                second.orders[0].created_at >= order.created_at,
                "descending order expected"
            );
        }
    }

    #[tokio::test]
    async fn page_size_is_defaulted_and_capped() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo.clone());

        service.list_orders(&list_request(0, None)).await.unwrap();
        assert_eq!(*repo.last_list_limit.lock().await, Some(20));

        service.list_orders(&list_request(1000, None)).await.unwrap();
        assert_eq!(*repo.last_list_limit.lock().await, Some(100));
    }

    #[tokio::test]
    async fn invalid_cursor_and_status_are_rejected() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo);

        let err = service
            .list_orders(&list_request(10, Some("!!not-a-cursor!!".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .list_orders(&ListOrdersRequest {
                user_id: "u1".into(),
                status: Some("unknown".into()),
                page_size: 10,
                cursor: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
