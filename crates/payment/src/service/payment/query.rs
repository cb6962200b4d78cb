use async_trait::async_trait;
use prometheus_client::registry::Registry;
use shared::errors::{RepositoryError, ServiceError};
use shared::utils::{Method, Metrics, Status};
use tokio::time::Instant;
use uuid::Uuid;

use crate::abstract_trait::payment::repository::DynPaymentQueryRepository;
use crate::abstract_trait::payment::service::PaymentQueryServiceTrait;
use crate::domain::response::PaymentResponse;

#[derive(Clone)]
pub struct PaymentQueryService {
    query: DynPaymentQueryRepository,
    metrics: Metrics,
}

impl PaymentQueryService {
    pub fn new(query: DynPaymentQueryRepository, registry: &mut Registry) -> Self {
        let metrics = Metrics::new();
        metrics.register("payment_query_service", registry);

        Self { query, metrics }
    }
}

#[async_trait]
impl PaymentQueryServiceTrait for PaymentQueryService {
    async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let started = Instant::now();

        let result = self
            .query
            .find_by_id(payment_id)
            .await
            .map_err(ServiceError::Repo)?
            .map(PaymentResponse::from)
            .ok_or(ServiceError::Repo(RepositoryError::NotFound));

        let status = if result.is_ok() {
            Status::Success
        } else {
            Status::Error
        };
        self.metrics
            .record(Method::Get, status, started.elapsed().as_secs_f64());

        result
    }
}
