use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::ServiceError;
use uuid::Uuid;

use crate::domain::requests::CreatePaymentRequest;
use crate::domain::response::PaymentResponse;

pub type DynPaymentCommandService = Arc<dyn PaymentCommandServiceTrait + Send + Sync>;
pub type DynPaymentQueryService = Arc<dyn PaymentQueryServiceTrait + Send + Sync>;

#[async_trait]
pub trait PaymentCommandServiceTrait {
    async fn create_payment(
        &self,
        req: &CreatePaymentRequest,
    ) -> Result<(PaymentResponse, bool), ServiceError>;

    // A declined or timed-out provider call is a recorded outcome, not an
    // error.
    async fn confirm_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError>;

    async fn cancel_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError>;

    async fn refund_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError>;
}

#[async_trait]
pub trait PaymentQueryServiceTrait {
    async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError>;
}
