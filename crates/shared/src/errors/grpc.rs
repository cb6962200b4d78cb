use thiserror::Error;
use tonic::Status;

use crate::errors::{repository::RepositoryError, service::ServiceError};

#[derive(Debug, Error)]
pub enum AppErrorGrpc {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
    #[error("Unhandled: {0}")]
    Unhandled(String),
}

impl From<AppErrorGrpc> for Status {
    fn from(err: AppErrorGrpc) -> Self {
        match err {
            AppErrorGrpc::Service(service_err) => match service_err {
                ServiceError::Validation(errors) => {
                    Status::invalid_argument(format!("Validation failed: {errors:#?}"))
                }

                ServiceError::InvalidTransition { from, to } => Status::failed_precondition(
                    format!("Illegal status transition: {from} -> {to}"),
                ),

                ServiceError::CircuitOpen { retry_after_secs } => Status::unavailable(format!(
                    "Payment provider unavailable, retry after {retry_after_secs}s"
                )),

                ServiceError::Kafka(err) => Status::unavailable(format!("Kafka error: {err}")),

                ServiceError::Unavailable(msg) => Status::unavailable(msg),

                ServiceError::Repo(repo_err) => match repo_err {
                    RepositoryError::NotFound => Status::not_found("Not found"),
                    RepositoryError::Conflict(msg) => Status::aborted(msg),
                    RepositoryError::AlreadyExists(msg) => Status::aborted(msg),
                    RepositoryError::InsufficientStock { .. } => {
                        Status::failed_precondition(repo_err.to_string())
                    }
                    RepositoryError::Sqlx(sqlx::Error::PoolTimedOut) => {
                        Status::resource_exhausted("Database connection pool exhausted")
                    }
                    RepositoryError::Sqlx(_) => Status::internal("Database error"),
                    RepositoryError::Custom(msg) => Status::internal(msg),
                },

                ServiceError::Internal(msg) => Status::internal(msg),

                ServiceError::Custom(msg) => Status::internal(msg),
            },

            AppErrorGrpc::Unhandled(msg) => Status::internal(format!("Unhandled error: {msg}")),
        }
    }
}
