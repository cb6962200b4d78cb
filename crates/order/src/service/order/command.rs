use async_trait::async_trait;
use prometheus_client::registry::Registry;
use shared::errors::ServiceError;
use shared::events::{
    AGGREGATE_ORDER, OrderCancelledPayload, OrderCreatedPayload, OrderItemPayload,
    OrderStatusPayload, TOPIC_ORDER_CANCELLED, TOPIC_ORDER_CREATED,
};
use shared::idempotency::IdempotencyStore;
use shared::outbox::NewOutboxEvent;
use shared::utils::{Method, Metrics, Status};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::abstract_trait::order::repository::{
    DynOrderCommandRepository, DynOrderQueryRepository,
};
use crate::abstract_trait::order::service::OrderCommandServiceTrait;
use crate::domain::requests::{
    CancelOrderRequest, CreateOrderRequest, UpdateOrderStatusRequest,
};
use crate::domain::response::OrderResponse;
use crate::model::{NewOrder, NewOrderItem, Order, OrderStatus};

const OP_CREATE_ORDER: &str = "create_order";

#[derive(Clone)]
pub struct OrderCommandService {
    command: DynOrderCommandRepository,
    query: DynOrderQueryRepository,
    idempotency: IdempotencyStore,
    metrics: Metrics,
}

pub struct OrderCommandServiceDeps {
    pub command: DynOrderCommandRepository,
    pub query: DynOrderQueryRepository,
    pub idempotency: IdempotencyStore,
}

impl OrderCommandService {
    pub fn new(deps: OrderCommandServiceDeps, registry: &mut Registry) -> Self {
        let OrderCommandServiceDeps {
            command,
            query,
            idempotency,
        } = deps;

        let metrics = Metrics::new();
        metrics.register("order_command_service", registry);

        Self {
            command,
            query,
            idempotency,
            metrics,
        }
    }

    fn validate(req: &CreateOrderRequest) -> Result<(), ServiceError> {
        if let Err(errors) = req.validate() {
            return Err(ServiceError::Validation(
                errors
                    .to_string()
                    .lines()
                    .map(|line| line.trim().to_string())
                    .filter(|line| !line.is_empty())
                    .collect(),
            ));
        }

        let mut currencies = req.items.iter().map(|item| item.unit_price.currency.as_str());
        if let Some(first) = currencies.next() {
            if currencies.any(|c| c != first) {
                return Err(ServiceError::Validation(vec![
                    "All items must share one currency".to_string(),
                ]));
            }
        }

        if req.items.iter().any(|item| item.unit_price.amount < 0) {
            return Err(ServiceError::Validation(vec![
                "Unit price cannot be negative".to_string(),
            ]));
        }

        Ok(())
    }

    async fn load_order(&self, order_id: Uuid) -> Result<Order, ServiceError> {
        self.query
            .find_by_id(order_id)
            .await
            .map_err(ServiceError::Repo)?
            .ok_or(ServiceError::Repo(
                shared::errors::RepositoryError::NotFound,
            ))
    }
}

#[async_trait]
impl OrderCommandServiceTrait for OrderCommandService {
    async fn create_order(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<(OrderResponse, bool), ServiceError> {
        info!("🏗️ Creating new order for user_id={}", req.user_id);
        let started = Instant::now();

        Self::validate(req)?;

        let key =
            IdempotencyStore::generate_key(&req.user_id, OP_CREATE_ORDER, &req.idempotency_key);

        if let Some(cached) = self.idempotency.get(&key).await {
            match serde_json::from_value::<OrderResponse>(cached.body) {
                Ok(response) => {
                    info!(
                        "🔁 Idempotent request, returning cached order {}",
                        response.id
                    );
                    self.metrics.record(
                        Method::Post,
                        Status::Success,
                        started.elapsed().as_secs_f64(),
                    );
                    return Ok((response, true));
                }
                Err(e) => {
                    warn!("Cached idempotency record is unreadable, recomputing: {e:?}");
                }
            }
        }

        let order_id = Uuid::new_v4();
        let currency = req.items[0].unit_price.currency.clone();
        let mut total_amount: i64 = 0;
        let mut items = Vec::with_capacity(req.items.len());
        let mut event_items = Vec::with_capacity(req.items.len());

        for draft in &req.items {
            let line_total = draft.unit_price.amount * i64::from(draft.quantity);
            total_amount += line_total;

            items.push(NewOrderItem {
                id: Uuid::new_v4(),
                product_id: draft.product_id.clone(),
                product_name: draft.product_name.clone(),
                quantity: draft.quantity,
                unit_price_amount: draft.unit_price.amount,
                unit_price_currency: draft.unit_price.currency.clone(),
                total_price_amount: line_total,
                total_price_currency: draft.unit_price.currency.clone(),
            });

            event_items.push(OrderItemPayload {
                product_id: draft.product_id.clone(),
                product_name: draft.product_name.clone(),
                quantity: draft.quantity,
                unit_price_amount: draft.unit_price.amount,
                unit_price_currency: draft.unit_price.currency.clone(),
            });
        }

        let new_order = NewOrder {
            id: order_id,
            user_id: req.user_id.clone(),
            idempotency_key: req.idempotency_key.clone(),
            total_amount,
            total_currency: currency.clone(),
            status: OrderStatus::Pending,
            shipping_street: req.shipping_address.street.clone(),
            shipping_city: req.shipping_address.city.clone(),
            shipping_state: req.shipping_address.state.clone(),
            shipping_postal_code: req.shipping_address.postal_code.clone(),
            shipping_country: req.shipping_address.country.clone(),
            items,
        };

        let payload = OrderCreatedPayload {
            order_id: order_id.to_string(),
            user_id: req.user_id.clone(),
            total: total_amount,
            currency,
            status: OrderStatus::Pending.as_str().to_string(),
            items: event_items,
        };
        let payload = serde_json::to_value(&payload)
            .map_err(|e| ServiceError::Internal(format!("Failed to serialize event: {e}")))?;

        let event = NewOutboxEvent::new(
            AGGREGATE_ORDER,
            &order_id.to_string(),
            TOPIC_ORDER_CREATED,
            payload,
        );

        let order = match self.command.create_with_outbox(&new_order, &event).await {
            Ok(order) => order,
            Err(err) if err.is_unique_violation() => {
                // Another submission with the same key committed first; the
                // unique constraint is the definitive dedupe point.
                let existing = self
                    .query
                    .find_by_idempotency_key(&req.user_id, &req.idempotency_key)
                    .await
                    .map_err(ServiceError::Repo)?
                    .ok_or_else(|| {
                        ServiceError::Repo(shared::errors::RepositoryError::Conflict(
                            "duplicate submission raced and the winner is not yet visible".into(),
                        ))
                    })?;

                let response = OrderResponse::from(existing);
                if let Ok(body) = serde_json::to_value(&response) {
                    self.idempotency.set(&key, 200, body).await;
                }

                self.metrics.record(
                    Method::Post,
                    Status::Success,
                    started.elapsed().as_secs_f64(),
                );
                return Ok((response, true));
            }
            Err(err) => {
                error!("❌ Failed to create order for user {}: {err:?}", req.user_id);
                self.metrics.record(
                    Method::Post,
                    Status::Error,
                    started.elapsed().as_secs_f64(),
                );
                return Err(ServiceError::Repo(err));
            }
        };

        let response = OrderResponse::from(order);

        match serde_json::to_value(&response) {
            Ok(body) => self.idempotency.set(&key, 200, body).await,
            Err(e) => warn!("Failed to cache idempotency result: {e:?}"),
        }

        info!(
            "✅ Order created | id={} user={} total={} {}",
            response.id, response.user_id, response.total_amount, response.total_currency
        );
        self.metrics.record(
            Method::Post,
            Status::Success,
            started.elapsed().as_secs_f64(),
        );

        Ok((response, false))
    }

    async fn cancel_order(&self, req: &CancelOrderRequest) -> Result<OrderResponse, ServiceError> {
        info!("🚫 Cancelling order {}", req.order_id);

        let order = self.load_order(req.order_id).await?;

        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition {
                from: order.status.as_str().to_string(),
                to: OrderStatus::Cancelled.as_str().to_string(),
            });
        }

        let payload = OrderCancelledPayload {
            order_id: req.order_id.to_string(),
            status: OrderStatus::Cancelled.as_str().to_string(),
            reason: req.reason.clone(),
        };
        let payload = serde_json::to_value(&payload)
            .map_err(|e| ServiceError::Internal(format!("Failed to serialize event: {e}")))?;

        let event = NewOutboxEvent::new(
            AGGREGATE_ORDER,
            &req.order_id.to_string(),
            TOPIC_ORDER_CANCELLED,
            payload,
        );

        let mut updated = self
            .command
            .update_status_with_outbox(req.order_id, order.status, OrderStatus::Cancelled, &event)
            .await
            .map_err(ServiceError::Repo)?;

        // Items are immutable after creation; reuse the loaded snapshot.
        updated.items = order.items;

        info!("✅ Order {} cancelled: {}", req.order_id, req.reason);
        Ok(OrderResponse::from(updated))
    }

    async fn update_order_status(
        &self,
        req: &UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let next: OrderStatus = req
            .status
            .parse()
            .map_err(|e: String| ServiceError::Validation(vec![e]))?;

        let order = self.load_order(req.order_id).await?;

        if !order.status.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition {
                from: order.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let payload = OrderStatusPayload {
            order_id: req.order_id.to_string(),
            status: next.as_str().to_string(),
        };
        let payload = serde_json::to_value(&payload)
            .map_err(|e| ServiceError::Internal(format!("Failed to serialize event: {e}")))?;

        let event = NewOutboxEvent::new(
            AGGREGATE_ORDER,
            &req.order_id.to_string(),
            &next.event_type(),
            payload,
        );

        let mut updated = self
            .command
            .update_status_with_outbox(req.order_id, order.status, next, &event)
            .await
            .map_err(ServiceError::Repo)?;

        updated.items = order.items;

        info!(
            "🔄 Order {} status updated to {}",
            req.order_id,
            next.as_str()
        );
        Ok(OrderResponse::from(updated))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use shared::cache::InMemoryCacheBackend;
    use shared::errors::RepositoryError;

    use super::*;
    use crate::domain::requests::{Money, OrderItemDraft, ShippingAddress};
    use crate::service::order::testing::FakeOrderRepository;

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            postal_code: "62701".into(),
            country: "US".into(),
        }
    }

    fn draft(product_id: &str, quantity: i32, amount: i64, currency: &str) -> OrderItemDraft {
        OrderItemDraft {
            product_id: product_id.into(),
            product_name: format!("Product {product_id}"),
            quantity,
            unit_price: Money {
                amount,
                currency: currency.into(),
            },
        }
    }

    fn create_request(user: &str, key: &str, items: Vec<OrderItemDraft>) -> CreateOrderRequest {
        CreateOrderRequest {
            user_id: user.into(),
            idempotency_key: key.into(),
            items,
            shipping_address: address(),
        }
    }

    fn service(repo: Arc<FakeOrderRepository>) -> OrderCommandService {
        let mut registry = Registry::default();
        OrderCommandService::new(
            OrderCommandServiceDeps {
                command: repo.clone(),
                query: repo,
                idempotency: IdempotencyStore::new(
                    Arc::new(InMemoryCacheBackend::new()),
                    Duration::from_secs(24 * 60 * 60),
                ),
            },
            &mut registry,
        )
    }

    #[tokio::test]
    async fn creates_order_with_computed_total_and_one_outbox_row() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo.clone());

        let req = create_request("u1", "k1", vec![draft("p1", 2, 500, "USD")]);
        let (order, was_replay) = service.create_order(&req).await.unwrap();

        assert!(!was_replay);
        assert_eq!(order.total_amount, 1000);
        assert_eq!(order.total_currency, "USD");
        assert_eq!(order.status, "pending");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].total_price_amount, 1000);

        assert_eq!(repo.order_count().await, 1);
        let events = repo.outbox_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "order.created");
        assert_eq!(events[0].aggregate_id, order.id.to_string());
        assert_eq!(events[0].payload["total"], 1000);
        assert_eq!(events[0].payload["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replays_cached_response_without_creating_a_second_order() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo.clone());
        let req = create_request("u1", "k1", vec![draft("p1", 1, 250, "USD")]);

        let (first, first_replay) = service.create_order(&req).await.unwrap();
        let (second, second_replay) = service.create_order(&req).await.unwrap();

        assert!(!first_replay);
        assert!(second_replay);
        assert_eq!(first.id, second.id);
        assert_eq!(repo.order_count().await, 1);
        assert_eq!(repo.outbox_events().await.len(), 1);
    }

    #[tokio::test]
    async fn parallel_duplicate_submissions_converge_on_one_order() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = Arc::new(service(repo.clone()));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let req = create_request("u1", "k1", vec![draft("p1", 2, 500, "USD")]);
                service.create_order(&req).await.unwrap()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        let mut fresh = 0;
        for handle in handles {
            let (order, was_replay) = handle.await.unwrap();
            ids.insert(order.id);
            if !was_replay {
                fresh += 1;
            }
        }

        assert_eq!(ids.len(), 1);
        assert!(fresh <= 1);
        assert_eq!(repo.order_count().await, 1);
        assert_eq!(repo.outbox_events().await.len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_requests_without_side_effects() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo.clone());

        let empty_items = create_request("u1", "k1", vec![]);
        let zero_quantity = create_request("u1", "k2", vec![draft("p1", 0, 500, "USD")]);
        let mixed_currency = create_request(
            "u1",
            "k3",
            vec![draft("p1", 1, 500, "USD"), draft("p2", 1, 300, "EUR")],
        );
        let mut missing_city = create_request("u1", "k4", vec![draft("p1", 1, 500, "USD")]);
        missing_city.shipping_address.city = String::new();

        for req in [empty_items, zero_quantity, mixed_currency, missing_city] {
            let err = service.create_order(&req).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{err:?}");
        }

        assert_eq!(repo.order_count().await, 0);
        assert!(repo.outbox_events().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_emits_event_with_reason() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo.clone());

        let req = create_request("u1", "k1", vec![draft("p1", 1, 500, "USD")]);
        let (order, _) = service.create_order(&req).await.unwrap();

        let cancelled = service
            .cancel_order(&CancelOrderRequest {
                order_id: order.id,
                reason: "customer changed their mind".into(),
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(cancelled.items.len(), 1);

        let events = repo.outbox_events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, "order.cancelled");
        assert_eq!(events[1].payload["reason"], "customer changed their mind");
    }

    #[tokio::test]
    async fn cancel_fails_for_terminal_orders() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo.clone());

        let delivered = repo.seed_order("u1", OrderStatus::Delivered).await;
        let err = service
            .cancel_order(&CancelOrderRequest {
                order_id: delivered,
                reason: "too late".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
        assert!(repo.outbox_events().await.is_empty());
    }

    #[tokio::test]
    async fn status_updates_follow_the_transition_graph() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo.clone());

        let req = create_request("u1", "k1", vec![draft("p1", 1, 500, "USD")]);
        let (order, _) = service.create_order(&req).await.unwrap();

        let confirmed = service
            .update_order_status(&UpdateOrderStatusRequest {
                order_id: order.id,
                status: "confirmed".into(),
            })
            .await
            .unwrap();
        assert_eq!(confirmed.status, "confirmed");

        let events = repo.outbox_events().await;
        assert_eq!(events.last().unwrap().event_type, "order.confirmed");

        // pending -> shipped is not an edge, and neither is confirmed -> shipped.
        let err = service
            .update_order_status(&UpdateOrderStatusRequest {
                order_id: order.id,
                status: "shipped".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
        assert_eq!(repo.outbox_events().await.len(), 2);
    }

    #[tokio::test]
    async fn update_status_for_missing_order_is_not_found() {
        let repo = Arc::new(FakeOrderRepository::default());
        let service = service(repo);

        let err = service
            .update_order_status(&UpdateOrderStatusRequest {
                order_id: Uuid::new_v4(),
                status: "confirmed".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Repo(RepositoryError::NotFound)
        ));
    }
}
