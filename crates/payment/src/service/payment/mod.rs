mod command;
mod query;

#[cfg(test)]
pub(crate) mod testing;

pub use self::command::{PaymentCommandService, PaymentCommandServiceDeps};
pub use self::query::PaymentQueryService;
