use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, message = "Order ID is required"))]
    pub order_id: String,

    #[validate(length(min = 1, message = "User ID is required"))]
    pub user_id: String,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,

    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,

    #[validate(length(min = 1, message = "Idempotency key is required"))]
    pub idempotency_key: String,
}
