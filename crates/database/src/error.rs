use sea_orm::{DbErr, TransactionError};
use thiserror::Error;

/// Error surface of the action layer. Every mutating service runs inside one
/// transaction; any variant returned from the closure rolls the whole
/// transaction back.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("validation failed on `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl ServiceError {
    pub fn not_found(entity: &'static str) -> Self {
        ServiceError::NotFound { entity }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(e) => ServiceError::Db(e),
            TransactionError::Transaction(e) => e,
        }
    }
}
