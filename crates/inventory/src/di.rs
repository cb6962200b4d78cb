use std::fmt;
use std::sync::Arc;

use prometheus_client::registry::Registry;
use shared::abstract_trait::DynKafka;
use shared::config::{ConnectionPool, CoreSettings};

use crate::repository::inventory::{InventoryCommandRepository, InventoryQueryRepository};
use crate::service::inventory::{InventoryCommandService, InventoryQueryService};

#[derive(Clone)]
pub struct DependenciesInject {
    pub inventory_command: InventoryCommandService,
    pub inventory_query: InventoryQueryService,
}

impl fmt::Debug for DependenciesInject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependenciesInject")
            .field("inventory_command", &"InventoryCommandService")
            .field("inventory_query", &"InventoryQueryService")
            .finish()
    }
}

pub struct DependenciesInjectDeps {
    pub pool: ConnectionPool,
    pub kafka: DynKafka,
    pub settings: CoreSettings,
}

impl DependenciesInject {
    pub fn new(deps: DependenciesInjectDeps, registry: &mut Registry) -> Self {
        let DependenciesInjectDeps {
            pool,
            kafka,
            settings,
        } = deps;

        let command_repo = Arc::new(InventoryCommandRepository::new(pool.clone()));
        let query_repo = Arc::new(InventoryQueryRepository::new(pool));

        let inventory_command = InventoryCommandService::new(
            command_repo,
            kafka,
            settings.reservation_default_ttl_secs,
            registry,
        );
        let inventory_query = InventoryQueryService::new(query_repo, registry);

        Self {
            inventory_command,
            inventory_query,
        }
    }
}
