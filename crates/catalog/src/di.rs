use std::fmt;
use std::sync::Arc;

use prometheus_client::registry::Registry;
use shared::cache::{CacheStore, RedisCacheBackend};
use shared::config::{ConnectionPool, CoreSettings, RedisPool};

use crate::repository::product::{ProductCommandRepository, ProductQueryRepository};
use crate::service::product::{ProductCommandService, ProductQueryService};

#[derive(Clone)]
pub struct DependenciesInject {
    pub product_command: ProductCommandService,
    pub product_query: ProductQueryService,
}

impl fmt::Debug for DependenciesInject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependenciesInject")
            .field("product_command", &"ProductCommandService")
            .field("product_query", &"ProductQueryService")
            .finish()
    }
}

pub struct DependenciesInjectDeps {
    pub pool: ConnectionPool,
    pub redis: RedisPool,
    pub settings: CoreSettings,
}

impl DependenciesInject {
    pub fn new(deps: DependenciesInjectDeps, registry: &mut Registry) -> Self {
        let DependenciesInjectDeps {
            pool,
            redis,
            settings,
        } = deps;

        let command_repo = Arc::new(ProductCommandRepository::new(pool.clone()));
        let query_repo = Arc::new(ProductQueryRepository::new(pool));

        let cache = Arc::new(CacheStore::new(Arc::new(RedisCacheBackend::new(
            redis.pool,
        ))));

        let product_command =
            ProductCommandService::new(command_repo, cache.clone(), registry);
        let product_query = ProductQueryService::new(
            query_repo,
            cache,
            settings.catalog_product_ttl,
            settings.catalog_list_ttl,
            registry,
        );

        Self {
            product_command,
            product_query,
        }
    }
}
