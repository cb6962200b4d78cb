mod command;
mod query;

pub use self::command::{DynOrderCommandRepository, OrderCommandRepositoryTrait};
pub use self::query::{DynOrderQueryRepository, ListOrdersQuery, OrderQueryRepositoryTrait};
