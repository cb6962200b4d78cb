use async_trait::async_trait;
use chrono::{Duration, Utc};
use shared::errors::RepositoryError;
use shared::outbox::NewOutboxEvent;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::abstract_trait::order::repository::{
    ListOrdersQuery, OrderCommandRepositoryTrait, OrderQueryRepositoryTrait,
};
use crate::model::{NewOrder, Order, OrderItem, OrderStatus};

// In-memory stand-in that keeps the unique (user_id, idempotency_key)
// constraint and the expected-status guard the real repository gets from
// Postgres.
#[derive(Default)]
pub(crate) struct FakeOrderRepository {
    orders: Mutex<Vec<Order>>,
    outbox: Mutex<Vec<NewOutboxEvent>>,
    pub last_list_limit: Mutex<Option<i64>>,
}

impl FakeOrderRepository {
    pub async fn order_count(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn outbox_events(&self) -> Vec<NewOutboxEvent> {
        self.outbox.lock().await.clone()
    }

    pub async fn seed_order(&self, user_id: &str, status: OrderStatus) -> Uuid {
        self.seed_order_at(user_id, status, 0).await
    }

    // age_ticks pushes created_at back so list ordering is deterministic.
    pub async fn seed_order_at(&self, user_id: &str, status: OrderStatus, age_ticks: i64) -> Uuid {
        let id = Uuid::new_v4();
        let created_at = Utc::now() - Duration::seconds(age_ticks);
        self.orders.lock().await.push(Order {
            id,
            user_id: user_id.to_string(),
            idempotency_key: id.to_string(),
            total_amount: 100,
            total_currency: "USD".to_string(),
            status,
            payment_id: None,
            shipping_street: "1 Main St".to_string(),
            shipping_city: "Springfield".to_string(),
            shipping_state: "IL".to_string(),
            shipping_postal_code: "62701".to_string(),
            shipping_country: "US".to_string(),
            created_at,
            updated_at: created_at,
            items: vec![],
        });
        id
    }
}

#[async_trait]
impl OrderCommandRepositoryTrait for FakeOrderRepository {
    async fn create_with_outbox(
        &self,
        order: &NewOrder,
        event: &NewOutboxEvent,
    ) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.lock().await;

        let duplicate = orders.iter().any(|existing| {
            existing.user_id == order.user_id && existing.idempotency_key == order.idempotency_key
        });
        if duplicate {
            return Err(RepositoryError::AlreadyExists(format!(
                "order already exists for idempotency key {}",
                order.idempotency_key
            )));
        }

        let now = Utc::now();
        let items = order
            .items
            .iter()
            .map(|item| OrderItem {
                id: item.id,
                order_id: order.id,
                product_id: item.product_id.clone(),
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price_amount: item.unit_price_amount,
                unit_price_currency: item.unit_price_currency.clone(),
                total_price_amount: item.total_price_amount,
                total_price_currency: item.total_price_currency.clone(),
                created_at: now,
            })
            .collect();

        let created = Order {
            id: order.id,
            user_id: order.user_id.clone(),
            idempotency_key: order.idempotency_key.clone(),
            total_amount: order.total_amount,
            total_currency: order.total_currency.clone(),
            status: order.status,
            payment_id: None,
            shipping_street: order.shipping_street.clone(),
            shipping_city: order.shipping_city.clone(),
            shipping_state: order.shipping_state.clone(),
            shipping_postal_code: order.shipping_postal_code.clone(),
            shipping_country: order.shipping_country.clone(),
            created_at: now,
            updated_at: now,
            items,
        };

        orders.push(created.clone());
        self.outbox.lock().await.push(event.clone());
        Ok(created)
    }

    async fn update_status_with_outbox(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        event: &NewOutboxEvent,
    ) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.lock().await;

        let order = orders
            .iter_mut()
            .find(|order| order.id == order_id)
            .ok_or(RepositoryError::NotFound)?;

        if order.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "order {order_id} is no longer in status {expected}"
            )));
        }

        order.status = next;
        order.updated_at = Utc::now();
        let updated = order.clone();

        self.outbox.lock().await.push(event.clone());
        Ok(updated)
    }
}

#[async_trait]
impl OrderQueryRepositoryTrait for FakeOrderRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .lock()
            .await
            .iter()
            .find(|order| order.id == id)
            .cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .lock()
            .await
            .iter()
            .find(|order| order.user_id == user_id && order.idempotency_key == idempotency_key)
            .cloned())
    }

    async fn list(&self, query: &ListOrdersQuery) -> Result<Vec<Order>, RepositoryError> {
        *self.last_list_limit.lock().await = Some(query.limit);

        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .await
            .iter()
            .filter(|order| order.user_id == query.user_id)
            .filter(|order| query.status.is_none_or(|status| order.status == status))
            .filter(|order| {
                query
                    .cursor
                    .as_ref()
                    .is_none_or(|cursor| (order.created_at, order.id) < (cursor.created_at, cursor.id))
            })
            .cloned()
            .collect();

        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        orders.truncate((query.limit + 1) as usize);
        Ok(orders)
    }
}
