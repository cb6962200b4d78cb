use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,

    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,

    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,

    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemDraft {
    #[validate(length(min = 1, message = "Product ID is required"))]
    pub product_id: String,

    #[validate(length(min = 1, message = "Product name is required"))]
    pub product_name: String,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    pub unit_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "User ID is required"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "Idempotency key is required"))]
    pub idempotency_key: String,

    #[validate(length(min = 1, message = "Items cannot be empty"), nested)]
    pub items: Vec<OrderItemDraft>,

    #[validate(nested)]
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrdersRequest {
    pub user_id: String,
    pub status: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: i32,
    pub cursor: Option<String>,
}

fn default_page_size() -> i32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub order_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub order_id: Uuid,
    pub status: String,
}
