use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::provider::{
    PaymentProvider, ProcessPaymentRequest, ProcessPaymentResponse, ProviderError, RefundResponse,
};

pub struct MockProvider {
    failure_rate: f64,
    delay: Duration,
}

impl MockProvider {
    pub fn new(failure_rate: f64, delay: Duration) -> Self {
        Self {
            failure_rate,
            delay,
        }
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn process_payment(
        &self,
        req: &ProcessPaymentRequest,
    ) -> Result<ProcessPaymentResponse, ProviderError> {
        tokio::time::sleep(self.delay).await;

        if rand::random::<f64>() < self.failure_rate {
            warn!("Payment processing failed (simulated) | order={}", req.order_id);
            return Err(ProviderError::Declined);
        }

        let transaction_id = format!("TXN-{}", Uuid::new_v4().simple());

        info!(
            "Payment processed (mock) | order={} transaction={} amount={}",
            req.order_id, transaction_id, req.amount
        );

        Ok(ProcessPaymentResponse {
            transaction_id,
            status: "succeeded".to_string(),
            message: "Payment processed successfully".to_string(),
        })
    }

    async fn cancel_payment(&self, transaction_id: &str) -> Result<(), ProviderError> {
        tokio::time::sleep(self.delay).await;
        info!("Payment cancelled (mock) | transaction={transaction_id}");
        Ok(())
    }

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: i64,
    ) -> Result<RefundResponse, ProviderError> {
        tokio::time::sleep(self.delay).await;

        let refund_id = format!("REFUND-{}", Uuid::new_v4().simple());
        info!(
            "Payment refunded (mock) | transaction={transaction_id} refund={refund_id} amount={amount}"
        );

        Ok(RefundResponse {
            refund_id,
            status: "succeeded".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProcessPaymentRequest {
        ProcessPaymentRequest {
            order_id: "o1".into(),
            amount: 1000,
            currency: "USD".into(),
            payment_method: "card".into(),
        }
    }

    #[tokio::test]
    async fn zero_failure_rate_always_succeeds() {
        let provider = MockProvider::new(0.0, Duration::ZERO);
        let response = provider.process_payment(&request()).await.unwrap();
        assert!(response.transaction_id.starts_with("TXN-"));
        assert_eq!(response.status, "succeeded");
    }

    #[tokio::test]
    async fn full_failure_rate_always_declines() {
        let provider = MockProvider::new(1.0, Duration::ZERO);
        let err = provider.process_payment(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Declined));
    }

    #[tokio::test]
    async fn cancel_and_refund_succeed() {
        let provider = MockProvider::new(1.0, Duration::ZERO);
        provider.cancel_payment("TXN-1").await.unwrap();

        let refund = provider.refund_payment("TXN-1", 1000).await.unwrap();
        assert!(refund.refund_id.starts_with("REFUND-"));
    }
}
