//! tm-db - Live-database executors for Tidemark
//!
//! This crate provides the `Database` trait the migrator drives, a DuckDB
//! implementation that renders operations to DDL and keeps its position in a
//! bookkeeping schema, and an in-memory implementation for tests and dry
//! runs.

mod bookkeeping;
pub mod duckdb;
pub mod error;
pub mod memory;
pub mod sql;
pub mod traits;

pub use crate::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use memory::MemoryBackend;
pub use traits::{with_transaction, Database, Direction, Transition};

use tm_core::{DatabaseConfig, DbType};

/// Open the backend described by `config`, resolving relative paths
/// against `root`.
pub fn open(config: &DatabaseConfig, root: &std::path::Path) -> DbResult<Box<dyn Database>> {
    match config.db_type {
        DbType::DuckDb => {
            let path = config.path_absolute(root);
            log::debug!("Opening DuckDB database at {}", path);
            Ok(Box::new(DuckDbBackend::new(&path)?))
        }
        DbType::Memory => Ok(Box::new(MemoryBackend::new())),
    }
}
