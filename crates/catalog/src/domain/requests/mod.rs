use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_amount: i64,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub price_currency: String,

    #[serde(default)]
    pub category: String,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    #[serde(default)]
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProductRequest {
    pub id: Uuid,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_amount: i64,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub price_currency: String,

    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStockRequest {
    pub product_id: Uuid,
    pub delta: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListProductsRequest {
    #[serde(default = "default_limit")]
    pub limit: i32,
    pub cursor: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

fn default_limit() -> i32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityItem {
    pub product_id: Uuid,
    pub quantity: i32,
}
