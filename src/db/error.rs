//! Error types for catalog operations

use thiserror::Error;

/// Shorthand for fallible catalog operations.
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

/// Errors produced by catalog queries and writes.
///
/// Variants carry only what the HTTP layer needs to pick a status code and a
/// safe message. Store-level detail stays in the source error and is logged
/// at the failure site, never echoed to clients.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A query parameter was rejected before any SQL was assembled.
    #[error("{0}")]
    InvalidParameter(String),

    /// A request body field violated its constraints.
    #[error("{0}")]
    ValidationFailed(String),

    /// A structurally required field or relation was absent.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    ReferenceNotFound { entity: &'static str, id: i64 },

    /// A unique constraint rejected the write.
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// The requested entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request carried no valid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// A statement failed to execute.
    #[error("query failed")]
    QueryFailed(#[source] sqlx::Error),

    /// A transaction could not begin or commit.
    #[error("transaction failed")]
    TransactionFailed(#[source] sqlx::Error),

    /// A non-database operation failed. Surfaced to clients as a generic
    /// internal error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::QueryFailed(err)
    }
}

fn has_pg_code(err: &sqlx::Error, code: &str) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|c| c == code)
}

/// Postgres foreign-key violation (SQLSTATE 23503).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_pg_code(err, "23503")
}

/// Postgres unique violation (SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_pg_code(err, "23505")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_not_found_names_the_missing_id() {
        let err = CatalogError::ReferenceNotFound {
            entity: "author",
            id: 7,
        };
        assert_eq!(err.to_string(), "author with id 7 not found");
    }

    #[test]
    fn test_query_failure_message_stays_generic() {
        let err = CatalogError::QueryFailed(sqlx::Error::PoolClosed);
        assert_eq!(err.to_string(), "query failed");
    }

    #[test]
    fn test_sqlx_errors_convert_to_query_failed() {
        let err: CatalogError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, CatalogError::QueryFailed(_)));
    }
}
