use sqlx::Error as SqlxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Sqlx(#[from] SqlxError),

    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Insufficient stock for product {product_id}: available={available}, requested={requested}")]
    InsufficientStock {
        product_id: String,
        available: i32,
        requested: i32,
    },

    #[error("Custom: {0}")]
    Custom(String),
}

impl RepositoryError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RepositoryError::Sqlx(SqlxError::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            RepositoryError::AlreadyExists(_) => true,
            _ => false,
        }
    }
}
