use std::sync::Arc;

use async_trait::async_trait;
use prometheus_client::registry::Registry;
use shared::breaker::{BreakerError, CircuitBreaker};
use shared::errors::{RepositoryError, ServiceError};
use shared::events::{
    AGGREGATE_PAYMENT, PaymentFailedPayload, PaymentRefundedPayload, PaymentSucceededPayload,
    TOPIC_PAYMENT_FAILED, TOPIC_PAYMENT_REFUNDED, TOPIC_PAYMENT_SUCCEEDED,
};
use shared::idempotency::IdempotencyStore;
use shared::outbox::NewOutboxEvent;
use shared::utils::{Method, Metrics, Status};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::abstract_trait::payment::repository::{
    DynPaymentCommandRepository, DynPaymentQueryRepository,
};
use crate::abstract_trait::payment::service::PaymentCommandServiceTrait;
use crate::domain::requests::CreatePaymentRequest;
use crate::domain::response::PaymentResponse;
use crate::model::{NewPayment, Payment, PaymentStatus};
use crate::provider::{DynPaymentProvider, ProcessPaymentRequest};

const OP_CREATE_PAYMENT: &str = "create_payment";

#[derive(Clone)]
pub struct PaymentCommandService {
    command: DynPaymentCommandRepository,
    query: DynPaymentQueryRepository,
    provider: DynPaymentProvider,
    breaker: Arc<CircuitBreaker>,
    idempotency: IdempotencyStore,
    metrics: Metrics,
}

pub struct PaymentCommandServiceDeps {
    pub command: DynPaymentCommandRepository,
    pub query: DynPaymentQueryRepository,
    pub provider: DynPaymentProvider,
    pub breaker: Arc<CircuitBreaker>,
    pub idempotency: IdempotencyStore,
}

impl PaymentCommandService {
    pub fn new(deps: PaymentCommandServiceDeps, registry: &mut Registry) -> Self {
        let PaymentCommandServiceDeps {
            command,
            query,
            provider,
            breaker,
            idempotency,
        } = deps;

        breaker.on_state_change(|from, to| {
            warn!(
                "⚡ Circuit breaker state changed: {} -> {}",
                from.as_str(),
                to.as_str()
            );
        });

        let metrics = Metrics::new();
        metrics.register("payment_command_service", registry);

        Self {
            command,
            query,
            provider,
            breaker,
            idempotency,
            metrics,
        }
    }

    async fn load_payment(&self, id: Uuid) -> Result<Payment, ServiceError> {
        self.query
            .find_by_id(id)
            .await
            .map_err(ServiceError::Repo)?
            .ok_or(ServiceError::Repo(RepositoryError::NotFound))
    }

    async fn record_failure(
        &self,
        payment: &Payment,
        message: &str,
    ) -> Result<Payment, ServiceError> {
        let payload = PaymentFailedPayload {
            payment_id: payment.id.to_string(),
            order_id: payment.order_id.clone(),
            error: message.to_string(),
        };
        let payload = serde_json::to_value(&payload)
            .map_err(|e| ServiceError::Internal(format!("Failed to serialize event: {e}")))?;

        let event = NewOutboxEvent::new(
            AGGREGATE_PAYMENT,
            &payment.id.to_string(),
            TOPIC_PAYMENT_FAILED,
            payload,
        );

        self.command
            .record_outcome(payment.id, PaymentStatus::Failed, None, Some(message), &event)
            .await
            .map_err(ServiceError::Repo)
    }
}

#[async_trait]
impl PaymentCommandServiceTrait for PaymentCommandService {
    async fn create_payment(
        &self,
        req: &CreatePaymentRequest,
    ) -> Result<(PaymentResponse, bool), ServiceError> {
        info!("💳 Creating payment for order {}", req.order_id);

        if let Err(errors) = req.validate() {
            return Err(ServiceError::Validation(
                errors
                    .to_string()
                    .lines()
                    .map(|line| line.trim().to_string())
                    .filter(|line| !line.is_empty())
                    .collect(),
            ));
        }

        let key =
            IdempotencyStore::generate_key(&req.user_id, OP_CREATE_PAYMENT, &req.idempotency_key);

        if let Some(cached) = self.idempotency.get(&key).await {
            match serde_json::from_value::<PaymentResponse>(cached.body) {
                Ok(response) => {
                    info!("🔁 Idempotent payment request for order {}", req.order_id);
                    return Ok((response, true));
                }
                Err(e) => warn!("Cached payment record is unreadable, recomputing: {e:?}"),
            }
        }

        let payment = self
            .command
            .create(&NewPayment {
                id: Uuid::new_v4(),
                order_id: req.order_id.clone(),
                user_id: req.user_id.clone(),
                amount: req.amount,
                currency: req.currency.clone(),
                method: req.payment_method.clone(),
            })
            .await
            .map_err(ServiceError::Repo)?;

        let response = PaymentResponse::from(payment);
        match serde_json::to_value(&response) {
            Ok(body) => self.idempotency.set(&key, 200, body).await,
            Err(e) => warn!("Failed to cache idempotency result: {e:?}"),
        }

        Ok((response, false))
    }

    async fn confirm_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let started = tokio::time::Instant::now();
        let payment = self.load_payment(payment_id).await?;

        if payment.status != PaymentStatus::Pending {
            // Already driven to an outcome; replay the stored result.
            info!(
                "🔁 Payment {} already {} — returning unchanged",
                payment_id, payment.status
            );
            return Ok(PaymentResponse::from(payment));
        }

        let payment = match self
            .command
            .transition(payment_id, PaymentStatus::Pending, PaymentStatus::Processing)
            .await
        {
            Ok(payment) => payment,
            Err(RepositoryError::Conflict(_)) => {
                // A concurrent executor claimed it; report what it decided.
                let current = self.load_payment(payment_id).await?;
                return Ok(PaymentResponse::from(current));
            }
            Err(e) => return Err(ServiceError::Repo(e)),
        };

        let provider = self.provider.clone();
        let provider_req = ProcessPaymentRequest {
            order_id: payment.order_id.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            payment_method: payment.method.clone(),
        };

        let result = self
            .breaker
            .call(move || async move { provider.process_payment(&provider_req).await })
            .await;

        match result {
            Ok(provider_resp) => {
                let payload = PaymentSucceededPayload {
                    payment_id: payment.id.to_string(),
                    order_id: payment.order_id.clone(),
                    transaction_id: provider_resp.transaction_id.clone(),
                };
                let payload = serde_json::to_value(&payload).map_err(|e| {
                    ServiceError::Internal(format!("Failed to serialize event: {e}"))
                })?;

                let event = NewOutboxEvent::new(
                    AGGREGATE_PAYMENT,
                    &payment.id.to_string(),
                    TOPIC_PAYMENT_SUCCEEDED,
                    payload,
                );

                let updated = self
                    .command
                    .record_outcome(
                        payment.id,
                        PaymentStatus::Succeeded,
                        Some(&provider_resp.transaction_id),
                        None,
                        &event,
                    )
                    .await
                    .map_err(ServiceError::Repo)?;

                info!(
                    "✅ Payment confirmed | id={} transaction={}",
                    payment.id, provider_resp.transaction_id
                );
                self.metrics
                    .record(Method::Post, Status::Success, started.elapsed().as_secs_f64());
                Ok(PaymentResponse::from(updated))
            }
            Err(BreakerError::Open) => {
                // No provider call was made, so no outcome exists; put the
                // payment back where a later confirm can pick it up.
                if let Err(e) = self
                    .command
                    .transition(payment_id, PaymentStatus::Processing, PaymentStatus::Pending)
                    .await
                {
                    error!("❌ Failed to revert payment {payment_id} to pending: {e:?}");
                }

                self.metrics
                    .record(Method::Post, Status::Error, started.elapsed().as_secs_f64());
                Err(ServiceError::CircuitOpen {
                    retry_after_secs: self.breaker.retry_after().as_secs().max(1),
                })
            }
            Err(breaker_err) => {
                let message = match &breaker_err {
                    BreakerError::Timeout => "provider call timed out".to_string(),
                    BreakerError::Call(e) => e.to_string(),
                    BreakerError::Open => unreachable!("handled above"),
                };
                error!("❌ Payment {} failed: {}", payment.id, message);

                // The business outcome is recorded and must not be retried
                // silently by a scheduler.
                let updated = self.record_failure(&payment, &message).await?;
                self.metrics
                    .record(Method::Post, Status::Error, started.elapsed().as_secs_f64());
                Ok(PaymentResponse::from(updated))
            }
        }
    }

    async fn cancel_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let payment = self.load_payment(payment_id).await?;

        if !payment.status.can_transition_to(PaymentStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition {
                from: payment.status.as_str().to_string(),
                to: PaymentStatus::Cancelled.as_str().to_string(),
            });
        }

        if let Some(transaction_id) = &payment.provider_transaction_id {
            if let Err(e) = self.provider.cancel_payment(transaction_id).await {
                warn!("Provider cancel for {} failed: {e}", payment_id);
            }
        }

        let updated = self
            .command
            .transition(payment_id, payment.status, PaymentStatus::Cancelled)
            .await
            .map_err(ServiceError::Repo)?;

        info!("🚫 Payment {} cancelled", payment_id);
        Ok(PaymentResponse::from(updated))
    }

    async fn refund_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let payment = self.load_payment(payment_id).await?;

        if !payment.status.can_transition_to(PaymentStatus::Refunded) {
            return Err(ServiceError::InvalidTransition {
                from: payment.status.as_str().to_string(),
                to: PaymentStatus::Refunded.as_str().to_string(),
            });
        }

        let transaction_id = payment.provider_transaction_id.clone().ok_or_else(|| {
            ServiceError::Internal(format!("payment {payment_id} has no provider transaction"))
        })?;

        let provider = self.provider.clone();
        let amount = payment.amount;
        let refund = self
            .breaker
            .call(move || {
                let transaction_id = transaction_id.clone();
                async move { provider.refund_payment(&transaction_id, amount).await }
            })
            .await
            .map_err(|e| match e {
                BreakerError::Open => ServiceError::CircuitOpen {
                    retry_after_secs: self.breaker.retry_after().as_secs().max(1),
                },
                BreakerError::Timeout => {
                    ServiceError::Unavailable("refund timed out".to_string())
                }
                BreakerError::Call(err) => ServiceError::Unavailable(format!("refund failed: {err}")),
            })?;

        let payload = PaymentRefundedPayload {
            payment_id: payment.id.to_string(),
            order_id: payment.order_id.clone(),
            refund_id: refund.refund_id.clone(),
        };
        let payload = serde_json::to_value(&payload)
            .map_err(|e| ServiceError::Internal(format!("Failed to serialize event: {e}")))?;

        let event = NewOutboxEvent::new(
            AGGREGATE_PAYMENT,
            &payment.id.to_string(),
            TOPIC_PAYMENT_REFUNDED,
            payload,
        );

        let updated = self
            .command
            .record_outcome(payment.id, PaymentStatus::Refunded, None, None, &event)
            .await
            .map_err(ServiceError::Repo)?;

        info!(
            "↩️ Payment {} refunded | refund={}",
            payment_id, refund.refund_id
        );
        Ok(PaymentResponse::from(updated))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use shared::breaker::{BreakerConfig, State};
    use shared::cache::InMemoryCacheBackend;

    use super::*;
    use crate::service::payment::testing::{FakePaymentRepository, ScriptedProvider};

    fn breaker() -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(BreakerConfig {
            max_failures: 5,
            timeout: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(30),
        }))
    }

    fn service(
        repo: Arc<FakePaymentRepository>,
        provider: Arc<ScriptedProvider>,
        breaker: Arc<CircuitBreaker>,
    ) -> PaymentCommandService {
        let mut registry = Registry::default();
        PaymentCommandService::new(
            PaymentCommandServiceDeps {
                command: repo.clone(),
                query: repo,
                provider,
                breaker,
                idempotency: IdempotencyStore::new(
                    Arc::new(InMemoryCacheBackend::new()),
                    Duration::from_secs(24 * 60 * 60),
                ),
            },
            &mut registry,
        )
    }

    fn create_request(order: &str, key: &str) -> CreatePaymentRequest {
        CreatePaymentRequest {
            order_id: order.into(),
            user_id: "u1".into(),
            amount: 1000,
            currency: "USD".into(),
            payment_method: "card".into(),
            idempotency_key: key.into(),
        }
    }

    #[tokio::test]
    async fn create_payment_replays_on_duplicate_key() {
        let repo = Arc::new(FakePaymentRepository::default());
        let provider = Arc::new(ScriptedProvider::succeeding());
        let service = service(repo.clone(), provider, breaker());

        let (first, first_replay) = service
            .create_payment(&create_request("o1", "k1"))
            .await
            .unwrap();
        let (second, second_replay) = service
            .create_payment(&create_request("o1", "k1"))
            .await
            .unwrap();

        assert!(!first_replay);
        assert!(second_replay);
        assert_eq!(first.id, second.id);
        assert_eq!(first.status, "pending");
        assert_eq!(repo.payment_count().await, 1);
    }

    #[tokio::test]
    async fn confirm_success_records_transaction_and_event() {
        let repo = Arc::new(FakePaymentRepository::default());
        let provider = Arc::new(ScriptedProvider::succeeding());
        let service = service(repo.clone(), provider.clone(), breaker());

        let (payment, _) = service
            .create_payment(&create_request("o1", "k1"))
            .await
            .unwrap();
        let confirmed = service.confirm_payment(payment.id).await.unwrap();

        assert_eq!(confirmed.status, "succeeded");
        assert!(confirmed.provider_transaction_id.is_some());
        assert_eq!(provider.process_calls.load(Ordering::SeqCst), 1);

        let events = repo.outbox_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "payment.succeeded");

        // A second confirm replays the stored outcome without a provider call.
        let replayed = service.confirm_payment(payment.id).await.unwrap();
        assert_eq!(replayed.status, "succeeded");
        assert_eq!(provider.process_calls.load(Ordering::SeqCst), 1);
        assert_eq!(repo.outbox_events().await.len(), 1);
    }

    #[tokio::test]
    async fn provider_decline_is_a_recorded_outcome_not_an_error() {
        let repo = Arc::new(FakePaymentRepository::default());
        let provider = Arc::new(ScriptedProvider::failing());
        let service = service(repo.clone(), provider, breaker());

        let (payment, _) = service
            .create_payment(&create_request("o1", "k1"))
            .await
            .unwrap();
        let failed = service.confirm_payment(payment.id).await.unwrap();

        assert_eq!(failed.status, "failed");
        assert!(failed.error_message.is_some());

        let events = repo.outbox_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "payment.failed");
    }

    #[tokio::test(start_paused = true)]
    async fn circuit_opens_after_five_failures_and_recovers() {
        let repo = Arc::new(FakePaymentRepository::default());
        let provider = Arc::new(ScriptedProvider::failing());
        let breaker = breaker();
        let service = service(repo.clone(), provider.clone(), breaker.clone());

        // Five distinct payments, five provider failures, five recorded
        // outcomes with events.
        for i in 0..5 {
            let (payment, _) = service
                .create_payment(&create_request(&format!("o{i}"), &format!("k{i}")))
                .await
                .unwrap();
            let failed = service.confirm_payment(payment.id).await.unwrap();
            assert_eq!(failed.status, "failed");
        }
        assert_eq!(breaker.state(), State::Open);
        assert_eq!(provider.process_calls.load(Ordering::SeqCst), 5);
        assert_eq!(repo.outbox_events().await.len(), 5);

        // Sixth call is rejected without touching the provider; the payment
        // returns to pending so it stays retryable.
        let (sixth, _) = service
            .create_payment(&create_request("o6", "k6"))
            .await
            .unwrap();
        let err = service.confirm_payment(sixth.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::CircuitOpen { .. }));
        assert_eq!(provider.process_calls.load(Ordering::SeqCst), 5);
        assert_eq!(repo.status_of(sixth.id).await, PaymentStatus::Pending);
        assert_eq!(repo.outbox_events().await.len(), 5);

        // After the reset window the half-open probe goes through and a
        // success closes the breaker.
        tokio::time::advance(Duration::from_secs(31)).await;
        provider.set_failing(false);

        let confirmed = service.confirm_payment(sixth.id).await.unwrap();
        assert_eq!(confirmed.status, "succeeded");
        assert_eq!(breaker.state(), State::Closed);
        assert_eq!(breaker.failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_timeout_is_recorded_as_failure() {
        let repo = Arc::new(FakePaymentRepository::default());
        let provider = Arc::new(ScriptedProvider::hanging());
        let breaker = Arc::new(CircuitBreaker::new(BreakerConfig {
            max_failures: 5,
            timeout: Duration::from_millis(100),
            reset_timeout: Duration::from_secs(30),
        }));
        let service = service(repo.clone(), provider, breaker.clone());

        let (payment, _) = service
            .create_payment(&create_request("o1", "k1"))
            .await
            .unwrap();
        let failed = service.confirm_payment(payment.id).await.unwrap();

        assert_eq!(failed.status, "failed");
        assert_eq!(
            failed.error_message.as_deref(),
            Some("provider call timed out")
        );
        assert_eq!(breaker.failures(), 1);
    }

    #[tokio::test]
    async fn refund_transitions_a_succeeded_payment() {
        let repo = Arc::new(FakePaymentRepository::default());
        let provider = Arc::new(ScriptedProvider::succeeding());
        let service = service(repo.clone(), provider, breaker());

        let (payment, _) = service
            .create_payment(&create_request("o1", "k1"))
            .await
            .unwrap();
        service.confirm_payment(payment.id).await.unwrap();

        let refunded = service.refund_payment(payment.id).await.unwrap();
        assert_eq!(refunded.status, "refunded");

        let events = repo.outbox_events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, "payment.refunded");

        // Pending payments have nothing to refund.
        let (fresh, _) = service
            .create_payment(&create_request("o2", "k2"))
            .await
            .unwrap();
        let err = service.refund_payment(fresh.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cancel_only_applies_to_pending_payments() {
        let repo = Arc::new(FakePaymentRepository::default());
        let provider = Arc::new(ScriptedProvider::succeeding());
        let service = service(repo.clone(), provider, breaker());

        let (payment, _) = service
            .create_payment(&create_request("o1", "k1"))
            .await
            .unwrap();
        let cancelled = service.cancel_payment(payment.id).await.unwrap();
        assert_eq!(cancelled.status, "cancelled");

        let err = service.cancel_payment(payment.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
    }
}
