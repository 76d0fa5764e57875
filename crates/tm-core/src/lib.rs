//! tm-core - Core library for Tidemark
//!
//! This crate provides the declarative schema model, the schema registry that
//! validates declarations into snapshots, the structural operations a
//! migration is made of, the differ that produces them, and project
//! configuration shared by the other Tidemark crates.

pub mod column_type;
pub mod config;
pub mod diff;
pub mod error;
mod identifier;
pub mod operation;
pub mod registry;
pub mod schema;
pub(crate) mod serde_helpers;
pub mod step;

pub use column_type::ColumnType;
pub use config::{Config, DatabaseConfig, DbType, TargetConfig};
pub use diff::{diff, Changeset, DiffOptions, Differ};
pub use error::{
    CoreError, CoreResult, DiffError, DiffResult, OperationConflict, SchemaError, SchemaResult,
};
pub use operation::{invert_all, Operation, Phase};
pub use registry::{ColumnDecl, SchemaRegistry, TableDecl};
pub use schema::{Column, ColumnName, DefaultValue, SchemaSnapshot, Table, TableName};
pub use step::{MigrationStep, StepId};
