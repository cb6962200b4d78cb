use std::fmt;
use std::sync::Arc;

use prometheus_client::registry::Registry;
use shared::breaker::{BreakerConfig, CircuitBreaker};
use shared::cache::RedisCacheBackend;
use shared::config::{ConnectionPool, CoreSettings, RedisPool};
use shared::idempotency::IdempotencyStore;
use shared::outbox::OutboxStore;

use crate::provider::DynPaymentProvider;
use crate::repository::payment::{PaymentCommandRepository, PaymentQueryRepository};
use crate::service::payment::{
    PaymentCommandService, PaymentCommandServiceDeps, PaymentQueryService,
};

#[derive(Clone)]
pub struct DependenciesInject {
    pub payment_command: PaymentCommandService,
    pub payment_query: PaymentQueryService,
}

impl fmt::Debug for DependenciesInject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependenciesInject")
            .field("payment_command", &"PaymentCommandService")
            .field("payment_query", &"PaymentQueryService")
            .finish()
    }
}

pub struct DependenciesInjectDeps {
    pub pool: ConnectionPool,
    pub redis: RedisPool,
    pub outbox: OutboxStore,
    pub provider: DynPaymentProvider,
    pub settings: CoreSettings,
}

impl DependenciesInject {
    pub fn new(deps: DependenciesInjectDeps, registry: &mut Registry) -> Self {
        let DependenciesInjectDeps {
            pool,
            redis,
            outbox,
            provider,
            settings,
        } = deps;

        let command_repo = Arc::new(PaymentCommandRepository::new(pool.clone(), outbox));
        let query_repo = Arc::new(PaymentQueryRepository::new(pool));

        let breaker = Arc::new(CircuitBreaker::new(BreakerConfig {
            max_failures: settings.payment_circuit_max_failures,
            timeout: settings.payment_circuit_timeout,
            reset_timeout: settings.payment_circuit_reset_timeout,
        }));

        let idempotency = IdempotencyStore::new(
            Arc::new(RedisCacheBackend::new(redis.pool)),
            settings.idempotency_ttl,
        );

        let payment_command = PaymentCommandService::new(
            PaymentCommandServiceDeps {
                command: command_repo,
                query: query_repo.clone(),
                provider,
                breaker,
                idempotency,
            },
            registry,
        );

        let payment_query = PaymentQueryService::new(query_repo, registry);

        Self {
            payment_command,
            payment_query,
        }
    }
}
