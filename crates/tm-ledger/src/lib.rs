//! tm-ledger - Migration ledger for Tidemark
//!
//! This crate persists migration steps as files, verifies that they form a
//! single chain, and moves a live database up and down that chain.

pub mod error;
pub mod ledger;
pub mod lock;
pub mod migrator;
pub mod script;
pub mod store;
pub mod target;

pub use error::{ApplyError, LedgerError, LedgerResult};
pub use ledger::{Ledger, RecordOptions};
pub use lock::{LedgerLock, LOCK_FILE_NAME};
pub use migrator::{MigrationReport, Migrator};
pub use script::render_script;
pub use target::Target;
