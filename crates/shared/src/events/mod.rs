use serde::{Deserialize, Serialize};

pub const TOPIC_ORDER_CREATED: &str = "order.created";
pub const TOPIC_ORDER_CANCELLED: &str = "order.cancelled";
pub const TOPIC_PAYMENT_SUCCEEDED: &str = "payment.succeeded";
pub const TOPIC_PAYMENT_FAILED: &str = "payment.failed";
pub const TOPIC_PAYMENT_REFUNDED: &str = "payment.refunded";
pub const TOPIC_STOCK_RESERVED: &str = "stock.reserved";
pub const TOPIC_STOCK_RELEASED: &str = "stock.released";

pub const AGGREGATE_ORDER: &str = "order";
pub const AGGREGATE_PAYMENT: &str = "payment";

// Message attributes carried on every published outbox event so consumers
// can route and dedupe.
pub const ATTR_EVENT_ID: &str = "event_id";
pub const ATTR_AGGREGATE_TYPE: &str = "aggregate_type";
pub const ATTR_AGGREGATE_ID: &str = "aggregate_id";
pub const ATTR_EVENT_TYPE: &str = "event_type";
pub const ATTR_MESSAGE_ID: &str = "message_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemPayload {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_amount: i64,
    pub unit_price_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedPayload {
    pub order_id: String,
    pub user_id: String,
    pub total: i64,
    pub currency: String,
    pub status: String,
    pub items: Vec<OrderItemPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusPayload {
    pub order_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledPayload {
    pub order_id: String,
    pub status: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSucceededPayload {
    pub payment_id: String,
    pub order_id: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedPayload {
    pub payment_id: String,
    pub order_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRefundedPayload {
    pub payment_id: String,
    pub order_id: String,
    pub refund_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItemPayload {
    pub product_id: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReservedPayload {
    pub reservation_id: String,
    pub items: Vec<StockItemPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReleasedPayload {
    pub reservation_id: String,
    pub reason: String,
}
