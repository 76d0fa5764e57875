//! In-memory backend
//!
//! Applies operations structurally to a [`SchemaSnapshot`], with the same
//! strict checks the snapshot itself enforces. Transactions save and
//! restore the whole state, so a rolled-back run leaves no trace.

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Direction, Transition};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use tm_core::{Operation, SchemaSnapshot, StepId};

#[derive(Debug, Clone, Default)]
struct State {
    schema: SchemaSnapshot,
    version: Option<StepId>,
    transitions: Vec<Transition>,
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    saved: Option<State>,
}

/// In-memory database backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    /// An empty database at base.
    pub fn new() -> Self {
        Self::default()
    }

    /// A database that already holds `schema`.
    pub fn with_schema(schema: SchemaSnapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State {
                    schema,
                    ..State::default()
                },
                saved: None,
            }),
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> DbResult<bool> {
        Ok(self.lock()?.saved.is_some())
    }
}

impl Database for MemoryBackend {
    fn db_type(&self) -> &'static str {
        "memory"
    }

    fn apply(&self, op: &Operation) -> DbResult<()> {
        let mut inner = self.lock()?;
        log::debug!("Applying in memory: {}", op);
        inner.state.schema = inner.state.schema.apply(std::slice::from_ref(op))?;
        Ok(())
    }

    fn render(&self, op: &Operation, _before: &SchemaSnapshot) -> DbResult<Vec<String>> {
        Ok(vec![format!("-- {}", op)])
    }

    fn introspect(&self) -> DbResult<SchemaSnapshot> {
        Ok(self.lock()?.state.schema.clone())
    }

    fn current_version(&self) -> DbResult<Option<StepId>> {
        Ok(self.lock()?.state.version.clone())
    }

    fn set_version(&self, version: Option<&StepId>) -> DbResult<()> {
        self.lock()?.state.version = version.cloned();
        Ok(())
    }

    fn record_transition(&self, step: &StepId, direction: Direction) -> DbResult<()> {
        self.lock()?.state.transitions.push(Transition {
            step_id: step.clone(),
            direction,
            applied_at: Utc::now(),
        });
        Ok(())
    }

    fn transitions(&self) -> DbResult<Vec<Transition>> {
        Ok(self.lock()?.state.transitions.clone())
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn begin(&self) -> DbResult<()> {
        let mut inner = self.lock()?;
        if inner.saved.is_some() {
            return Err(DbError::TransactionError(
                "BEGIN failed: a transaction is already open".to_string(),
            ));
        }
        inner.saved = Some(inner.state.clone());
        Ok(())
    }

    fn commit(&self) -> DbResult<()> {
        let mut inner = self.lock()?;
        inner
            .saved
            .take()
            .map(|_| ())
            .ok_or_else(|| DbError::TransactionError("COMMIT failed: no open transaction".to_string()))
    }

    fn rollback(&self) -> DbResult<()> {
        let mut inner = self.lock()?;
        let saved = inner.saved.take().ok_or_else(|| {
            DbError::TransactionError("ROLLBACK failed: no open transaction".to_string())
        })?;
        inner.state = saved;
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
