//! Database trait definition

use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use tm_core::{Operation, SchemaSnapshot, StepId};

/// Direction of a position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Forward operations were applied
    Up,
    /// Reverse operations were applied
    Down,
    /// The position moved without running DDL
    Stamp,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Stamp => "stamp",
        })
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "stamp" => Ok(Direction::Stamp),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// One entry of the applied log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub step_id: StepId,
    pub direction: Direction,
    pub applied_at: DateTime<Utc>,
}

/// Executor interface for a live database.
///
/// Implementations must be Send + Sync; all methods take `&self` and guard
/// their connection internally.
pub trait Database: Send + Sync {
    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Run one structural operation against the live schema.
    fn apply(&self, op: &Operation) -> DbResult<()>;

    /// Statements `apply` would run for `op`, given the schema it runs against.
    fn render(&self, op: &Operation, before: &SchemaSnapshot) -> DbResult<Vec<String>>;

    /// Read the live user schema.
    fn introspect(&self) -> DbResult<SchemaSnapshot>;

    /// The step the database currently reflects, or `None` at base.
    fn current_version(&self) -> DbResult<Option<StepId>>;

    /// Move the position pointer.
    fn set_version(&self, version: Option<&StepId>) -> DbResult<()>;

    /// Statements that move the pointer, for offline scripts.
    fn render_set_version(&self, _version: Option<&StepId>) -> Vec<String> {
        Vec::new()
    }

    /// Append to the applied log.
    fn record_transition(&self, _step: &StepId, _direction: Direction) -> DbResult<()> {
        Ok(())
    }

    /// Applied log, oldest first.
    fn transitions(&self) -> DbResult<Vec<Transition>> {
        Ok(Vec::new())
    }

    /// Whether DDL can be rolled back.
    fn supports_transactions(&self) -> bool;

    fn begin(&self) -> DbResult<()>;

    fn commit(&self) -> DbResult<()>;

    fn rollback(&self) -> DbResult<()>;
}

/// Execute `body` within a `begin` / `commit` pair, rolling back on error.
///
/// Runs `body` directly when the backend has no transactions.
pub fn with_transaction<D, T, E, F>(db: &D, body: F) -> Result<T, E>
where
    D: Database + ?Sized,
    E: From<DbError>,
    F: FnOnce(&D) -> Result<T, E>,
{
    if !db.supports_transactions() {
        return body(db);
    }

    db.begin()?;
    let result = body(db);
    match &result {
        Ok(_) => {
            if let Err(commit_err) = db.commit() {
                if let Err(e) = db.rollback() {
                    log::warn!("Rollback after failed commit also failed: {}", e);
                }
                return Err(commit_err.into());
            }
        }
        Err(_) => {
            if let Err(e) = db.rollback() {
                log::warn!("Rollback failed: {}", e);
            }
        }
    }
    result
}
