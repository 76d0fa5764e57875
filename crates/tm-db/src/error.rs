//! Error types for tm-db

use thiserror::Error;
use tm_core::OperationConflict;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table not found: {0}")]
    TableNotFound(String),

    /// Operation does not fit the live schema (D004)
    #[error("[D004] {0}")]
    Conflict(#[from] OperationConflict),

    /// Live schema could not be read (D005)
    #[error("[D005] Schema introspection failed: {0}")]
    Introspection(String),

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// BEGIN/COMMIT/ROLLBACK failed (D007)
    #[error("[D007] Transaction error: {0}")]
    TransactionError(String),

    /// Live column type has no logical equivalent (D008)
    #[error("[D008] Unsupported column type '{type_name}' for '{table}.{column}'")]
    UnsupportedType {
        table: String,
        column: String,
        type_name: String,
    },

    /// Existing data violates a new constraint (D009)
    #[error("[D009] Constraint violated: {0}")]
    ConstraintViolation(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so the message
        // prefix is the only way to classify it.
        let msg = err.to_string();
        if msg.contains("Constraint Error") {
            DbError::ConstraintViolation(msg)
        } else if msg.contains("Table with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
