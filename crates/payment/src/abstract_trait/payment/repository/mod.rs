use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::RepositoryError;
use shared::outbox::NewOutboxEvent;
use uuid::Uuid;

use crate::model::{NewPayment, Payment, PaymentStatus};

pub type DynPaymentCommandRepository = Arc<dyn PaymentCommandRepositoryTrait + Send + Sync>;
pub type DynPaymentQueryRepository = Arc<dyn PaymentQueryRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait PaymentCommandRepositoryTrait {
    async fn create(&self, payment: &NewPayment) -> Result<Payment, RepositoryError>;

    // Guarded transition: a mismatch on the expected status means a
    // concurrent executor got there first.
    async fn transition(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<Payment, RepositoryError>;

    async fn record_outcome(
        &self,
        id: Uuid,
        status: PaymentStatus,
        transaction_id: Option<&str>,
        error_message: Option<&str>,
        event: &NewOutboxEvent,
    ) -> Result<Payment, RepositoryError>;
}

#[async_trait]
pub trait PaymentQueryRepositoryTrait {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, RepositoryError>;
}
