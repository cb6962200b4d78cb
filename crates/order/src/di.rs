use std::fmt;
use std::sync::Arc;

use prometheus_client::registry::Registry;
use shared::cache::RedisCacheBackend;
use shared::config::{ConnectionPool, CoreSettings, RedisPool};
use shared::idempotency::IdempotencyStore;
use shared::outbox::OutboxStore;

use crate::repository::order::{OrderCommandRepository, OrderQueryRepository};
use crate::service::order::{OrderCommandService, OrderCommandServiceDeps, OrderQueryService};

#[derive(Clone)]
pub struct DependenciesInject {
    pub order_command: OrderCommandService,
    pub order_query: OrderQueryService,
}

impl fmt::Debug for DependenciesInject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependenciesInject")
            .field("order_command", &"OrderCommandService")
            .field("order_query", &"OrderQueryService")
            .finish()
    }
}

pub struct DependenciesInjectDeps {
    pub pool: ConnectionPool,
    pub redis: RedisPool,
    pub outbox: OutboxStore,
    pub settings: CoreSettings,
}

impl DependenciesInject {
    pub fn new(deps: DependenciesInjectDeps, registry: &mut Registry) -> Self {
        let DependenciesInjectDeps {
            pool,
            redis,
            outbox,
            settings,
        } = deps;

        let command_repo = Arc::new(OrderCommandRepository::new(pool.clone(), outbox));
        let query_repo = Arc::new(OrderQueryRepository::new(pool));

        let idempotency = IdempotencyStore::new(
            Arc::new(RedisCacheBackend::new(redis.pool)),
            settings.idempotency_ttl,
        );

        let order_command = OrderCommandService::new(
            OrderCommandServiceDeps {
                command: command_repo,
                query: query_repo.clone(),
                idempotency,
            },
            registry,
        );

        let order_query = OrderQueryService::new(query_repo, registry);

        Self {
            order_command,
            order_query,
        }
    }
}
