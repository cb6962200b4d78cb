use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use shared::errors::RepositoryError;
use shared::outbox::NewOutboxEvent;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::abstract_trait::payment::repository::{
    PaymentCommandRepositoryTrait, PaymentQueryRepositoryTrait,
};
use crate::model::{NewPayment, Payment, PaymentStatus};
use crate::provider::{
    PaymentProvider, ProcessPaymentRequest, ProcessPaymentResponse, ProviderError, RefundResponse,
};

#[derive(Default)]
pub(crate) struct FakePaymentRepository {
    payments: Mutex<Vec<Payment>>,
    outbox: Mutex<Vec<NewOutboxEvent>>,
}

impl FakePaymentRepository {
    pub async fn payment_count(&self) -> usize {
        self.payments.lock().await.len()
    }

    pub async fn outbox_events(&self) -> Vec<NewOutboxEvent> {
        self.outbox.lock().await.clone()
    }

    pub async fn status_of(&self, id: Uuid) -> PaymentStatus {
        self.payments
            .lock()
            .await
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.status)
            .expect("payment exists")
    }
}

#[async_trait]
impl PaymentCommandRepositoryTrait for FakePaymentRepository {
    async fn create(&self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        let now = Utc::now();
        let created = Payment {
            id: payment.id,
            order_id: payment.order_id.clone(),
            user_id: payment.user_id.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            status: PaymentStatus::Pending,
            method: payment.method.clone(),
            provider_transaction_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.payments.lock().await.push(created.clone());
        Ok(created)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        let mut payments = self.payments.lock().await;
        let payment = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if payment.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "payment {id} is no longer in status {expected}"
            )));
        }

        payment.status = next;
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }

    async fn record_outcome(
        &self,
        id: Uuid,
        status: PaymentStatus,
        transaction_id: Option<&str>,
        error_message: Option<&str>,
        event: &NewOutboxEvent,
    ) -> Result<Payment, RepositoryError> {
        let mut payments = self.payments.lock().await;
        let payment = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;

        payment.status = status;
        if let Some(transaction_id) = transaction_id {
            payment.provider_transaction_id = Some(transaction_id.to_string());
        }
        payment.error_message = error_message.map(str::to_string);
        payment.updated_at = Utc::now();
        let updated = payment.clone();

        self.outbox.lock().await.push(event.clone());
        Ok(updated)
    }
}

#[async_trait]
impl PaymentQueryRepositoryTrait for FakePaymentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, RepositoryError> {
        Ok(self
            .payments
            .lock()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }
}

// Deterministic provider double: fail or succeed on demand, or hang past
// any call timeout.
pub(crate) struct ScriptedProvider {
    failing: AtomicBool,
    hang: bool,
    pub process_calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn succeeding() -> Self {
        Self {
            failing: AtomicBool::new(false),
            hang: false,
            process_calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            hang: false,
            process_calls: AtomicU32::new(0),
        }
    }

    pub fn hanging() -> Self {
        Self {
            failing: AtomicBool::new(false),
            hang: true,
            process_calls: AtomicU32::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn process_payment(
        &self,
        _req: &ProcessPaymentRequest,
    ) -> Result<ProcessPaymentResponse, ProviderError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);

        if self.hang {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Declined);
        }

        Ok(ProcessPaymentResponse {
            transaction_id: format!("TXN-{}", Uuid::new_v4().simple()),
            status: "succeeded".to_string(),
            message: "ok".to_string(),
        })
    }

    async fn cancel_payment(&self, _transaction_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn refund_payment(
        &self,
        _transaction_id: &str,
        _amount: i64,
    ) -> Result<RefundResponse, ProviderError> {
        Ok(RefundResponse {
            refund_id: format!("REFUND-{}", Uuid::new_v4().simple()),
            status: "succeeded".to_string(),
        })
    }
}
