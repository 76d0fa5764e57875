//! Error types for tm-core

use crate::schema::{ColumnName, TableName};
use thiserror::Error;

/// Core error type for configuration and declaration loading
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Invalid configuration value
    #[error("[E002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E003: Named target missing from the configuration
    #[error("[E003] Unknown target '{name}'. Available targets: {available}")]
    UnknownTarget { name: String, available: String },

    /// E004: Failed to parse a table declaration file
    #[error("[E004] Failed to parse table declaration {path}: {details}")]
    DeclarationParse { path: String, details: String },

    /// E005: IO error
    #[error("[E005] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E006: IO error with file path context
    #[error("[E006] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E007: YAML parse error
    #[error("[E007] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// E008: JSON serialization/deserialization error
    #[error("[E008] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// A declared schema that cannot be reconciled.
///
/// Names are kept as raw strings because the offending value may not be a
/// valid identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// S001: Table declares no primary-key column
    #[error("[S001] Table '{table}' has no primary-key column")]
    MissingPrimaryKey { table: String },

    /// S002: Table declares more than one primary-key column
    #[error("[S002] Table '{table}' declares several primary-key columns: {columns}")]
    MultiplePrimaryKeys { table: String, columns: String },

    /// S003: Column declared twice in one table
    #[error("[S003] Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// S004: Table declared twice
    #[error("[S004] Duplicate table '{table}'")]
    DuplicateTable { table: String },

    /// S005: Column type not recognized
    #[error("[S005] Unknown type '{type_name}' for column '{table}.{column}'")]
    UnknownType {
        table: String,
        column: String,
        type_name: String,
    },

    /// S006: Name is not a plain SQL identifier
    #[error("[S006] Invalid {kind} name '{name}': use letters, digits, and underscores, not starting with a digit")]
    InvalidName { kind: &'static str, name: String },

    /// S007: Table declares no columns
    #[error("[S007] Table '{table}' has no columns")]
    EmptyTable { table: String },

    /// S008: Primary key explicitly declared nullable
    #[error("[S008] Primary-key column '{table}.{column}' cannot be nullable")]
    NullablePrimaryKey { table: String, column: String },
}

/// Result type alias for SchemaError
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A structural change the differ cannot express unambiguously.
#[derive(Error, Debug)]
pub enum DiffError {
    /// DF001: A dropped and a created table are indistinguishable from a rename
    #[error("[DF001] Table '{from}' was removed and '{to}' was added with identical columns; renames are not tracked. Re-run with drop+create semantics if that is intended")]
    AmbiguousTableRename { from: TableName, to: TableName },

    /// DF002: A dropped and an added column are indistinguishable from a rename
    #[error("[DF002] Column '{table}.{from}' was removed and '{table}.{to}' was added with the same definition; renames are not tracked. Re-run with drop+create semantics if that is intended")]
    AmbiguousColumnRename {
        table: TableName,
        from: ColumnName,
        to: ColumnName,
    },

    /// DF003: Primary key of an existing table changed
    #[error("[DF003] Primary key of table '{table}' changed from '{from}' to '{to}'; primary keys cannot be altered in place")]
    PrimaryKeyChanged {
        table: TableName,
        from: String,
        to: String,
    },

    /// DF004: Step content could not be encoded for hashing
    #[error("[DF004] Failed to encode migration step: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type alias for DiffError
pub type DiffResult<T> = Result<T, DiffError>;

/// An operation that does not fit the schema state it is applied to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationConflict {
    /// OP001
    #[error("[OP001] Table '{table}' already exists")]
    TableExists { table: TableName },

    /// OP002
    #[error("[OP002] Table '{table}' does not exist")]
    TableMissing { table: TableName },

    /// OP003
    #[error("[OP003] Table '{table}' does not match the recorded definition")]
    TableMismatch { table: TableName },

    /// OP004
    #[error("[OP004] Column '{table}.{column}' already exists")]
    ColumnExists { table: TableName, column: ColumnName },

    /// OP005
    #[error("[OP005] Column '{table}.{column}' does not exist")]
    ColumnMissing { table: TableName, column: ColumnName },

    /// OP006
    #[error("[OP006] Column '{table}.{column}' does not match the recorded definition")]
    ColumnMismatch { table: TableName, column: ColumnName },

    /// OP007
    #[error("[OP007] Cannot rename column '{table}.{from}' to '{to}' with an alter")]
    RenameUnsupported {
        table: TableName,
        from: ColumnName,
        to: ColumnName,
    },
}
