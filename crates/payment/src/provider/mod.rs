mod mock;

pub use self::mock::MockProvider;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type DynPaymentProvider = Arc<dyn PaymentProvider + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("payment declined by provider")]
    Declined,

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaymentRequest {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaymentResponse {
    pub transaction_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub refund_id: String,
    pub status: String,
}

#[async_trait]
pub trait PaymentProvider {
    async fn process_payment(
        &self,
        req: &ProcessPaymentRequest,
    ) -> Result<ProcessPaymentResponse, ProviderError>;

    async fn cancel_payment(&self, transaction_id: &str) -> Result<(), ProviderError>;

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: i64,
    ) -> Result<RefundResponse, ProviderError>;
}
