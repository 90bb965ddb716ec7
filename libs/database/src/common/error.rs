use std::borrow::Cow;

use crate::transaction::TransactionFailure;

/// Unified database error type for all database operations
///
/// Usable directly as the error type of a unit of work: it converts from the
/// store errors and exposes their condition codes to the retry classifier.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// PostgreSQL-specific errors (SeaORM)
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sea_orm::DbErr),

    /// Statement rejected by a store that reports condition codes directly
    #[error("Query failed: {message}")]
    Query {
        code: Option<String>,
        message: String,
    },

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Configuration error
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    Config(#[from] core_config::ConfigError),

    /// Generic database error
    #[error("Database error: {0}")]
    Generic(String),
}

impl TransactionFailure for DatabaseError {
    fn condition_code(&self) -> Option<Cow<'_, str>> {
        match self {
            #[cfg(feature = "postgres")]
            DatabaseError::Postgres(err) => err.condition_code(),
            DatabaseError::Query { code, .. } => code.as_deref().map(Cow::Borrowed),
            _ => None,
        }
    }
}

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{ErrorClass, classify};

    #[test]
    fn test_query_error_exposes_code() {
        let err = DatabaseError::Query {
            code: Some("40001".to_string()),
            message: "conflict".to_string(),
        };
        assert_eq!(err.condition_code().as_deref(), Some("40001"));
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[test]
    fn test_connection_failure_is_fatal() {
        let err = DatabaseError::ConnectionFailed("refused".to_string());
        assert!(err.condition_code().is_none());
        assert_eq!(classify(&err), ErrorClass::Fatal);
    }
}
