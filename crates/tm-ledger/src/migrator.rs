//! Moves a live database along the ledger.

use crate::error::{describe, ApplyError, LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::script::render_script;
use crate::target::Target;
use tm_core::{Changeset, DiffOptions, Differ, MigrationStep, SchemaSnapshot, StepId};
use tm_db::{with_transaction, Database, Direction};

/// Outcome of an upgrade, downgrade, or stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub direction: Direction,
    /// Position before the run
    pub from: Option<StepId>,
    /// Position after the run
    pub to: Option<StepId>,
    /// Steps applied, in the order they ran
    pub steps: Vec<StepId>,
    /// Total operations executed
    pub operations: usize,
}

impl MigrationReport {
    /// Whether the position did not move.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    fn record(&mut self, step: &MigrationStep, direction: Direction, operations: usize) {
        self.to = position_after(step, direction);
        self.steps.push(step.id.clone());
        self.operations += operations;
    }
}

/// Applies ledger steps to a live database.
pub struct Migrator<'a> {
    ledger: &'a Ledger,
    db: &'a dyn Database,
    transaction_per_step: bool,
}

impl<'a> Migrator<'a> {
    pub fn new(ledger: &'a Ledger, db: &'a dyn Database) -> Self {
        Self {
            ledger,
            db,
            transaction_per_step: false,
        }
    }

    /// Commit after each step instead of once per run.
    pub fn with_transaction_per_step(mut self, enabled: bool) -> Self {
        self.transaction_per_step = enabled;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        self.ledger
    }

    /// Last applied step, or `None` at base.
    pub fn current(&self) -> LedgerResult<Option<StepId>> {
        let version = self.db.current_version()?;
        match version {
            Some(id) if self.ledger.applied_count(Some(&id)).is_none() => {
                Err(LedgerError::UnknownDatabaseVersion { id })
            }
            other => Ok(other),
        }
    }

    /// Steps recorded in the ledger but not yet applied.
    pub fn pending(&self) -> LedgerResult<&'a [MigrationStep]> {
        let current = self.current()?;
        let applied = self.position(current.as_ref())?;
        Ok(&self.ledger.steps()[applied..])
    }

    fn position(&self, id: Option<&StepId>) -> LedgerResult<usize> {
        self.ledger
            .applied_count(id)
            .ok_or_else(|| LedgerError::UnknownStep { id: describe(id) })
    }

    /// Steps to run forward to reach `target`, in chain order.
    pub fn plan_upgrade(&self, target: &Target) -> LedgerResult<Vec<&'a MigrationStep>> {
        let current = self.current()?;
        let to = self.ledger.resolve(target, current.as_ref())?;
        let (from_pos, to_pos) = (self.position(current.as_ref())?, self.position(to.as_ref())?);
        if to_pos < from_pos {
            return Err(LedgerError::InvalidTarget {
                target: target.to_string(),
                reason: format!(
                    "{} is behind the current position {}; use downgrade",
                    describe(to.as_ref()),
                    describe(current.as_ref())
                ),
            });
        }
        Ok(self.ledger.steps()[from_pos..to_pos].iter().collect())
    }

    /// Steps to run backward to reach `target`, newest first.
    pub fn plan_downgrade(&self, target: &Target) -> LedgerResult<Vec<&'a MigrationStep>> {
        let current = self.current()?;
        let to = self.ledger.resolve(target, current.as_ref())?;
        let (from_pos, to_pos) = (self.position(current.as_ref())?, self.position(to.as_ref())?);
        if to_pos > from_pos {
            return Err(LedgerError::InvalidTarget {
                target: target.to_string(),
                reason: format!(
                    "{} is ahead of the current position {}; use upgrade",
                    describe(to.as_ref()),
                    describe(current.as_ref())
                ),
            });
        }
        Ok(self.ledger.steps()[to_pos..from_pos].iter().rev().collect())
    }

    /// Apply forward operations up to and including `target`.
    pub fn upgrade(&self, target: &Target) -> LedgerResult<MigrationReport> {
        let _lock = self.ledger.lock()?;
        let steps = self.plan_upgrade(target)?;
        self.run(&steps, Direction::Up)
    }

    /// Apply reverse operations back to (excluding) `target`.
    pub fn downgrade(&self, target: &Target) -> LedgerResult<MigrationReport> {
        let _lock = self.ledger.lock()?;
        let steps = self.plan_downgrade(target)?;
        self.run(&steps, Direction::Down)
    }

    /// Move the pointer to `target` without running any DDL.
    ///
    /// The current position is not checked, so stamping also repairs a
    /// database that points outside the ledger.
    pub fn stamp(&self, target: &Target) -> LedgerResult<MigrationReport> {
        let _lock = self.ledger.lock()?;
        let from = self.db.current_version()?;
        let relative_from = from
            .as_ref()
            .filter(|id| self.ledger.applied_count(Some(*id)).is_some());
        let to = self.ledger.resolve(target, relative_from)?;

        with_transaction(self.db, |db| -> LedgerResult<()> {
            db.set_version(to.as_ref())?;
            if let Some(id) = &to {
                db.record_transition(id, Direction::Stamp)?;
            }
            Ok(())
        })?;
        log::info!("Stamped database at {}", describe(to.as_ref()));

        Ok(MigrationReport {
            direction: Direction::Stamp,
            from,
            steps: to.iter().cloned().collect(),
            to,
            operations: 0,
        })
    }

    /// SQL an upgrade to `target` would run, without touching the database.
    pub fn upgrade_sql(&self, target: &Target) -> LedgerResult<String> {
        let steps = self.plan_upgrade(target)?;
        render_script(self.ledger, self.db, &steps, Direction::Up, self.transaction_per_step)
    }

    /// SQL a downgrade to `target` would run, without touching the database.
    pub fn downgrade_sql(&self, target: &Target) -> LedgerResult<String> {
        let steps = self.plan_downgrade(target)?;
        render_script(self.ledger, self.db, &steps, Direction::Down, self.transaction_per_step)
    }

    /// Changes in `declared` not yet recorded in the ledger.
    pub fn check(&self, declared: &SchemaSnapshot, options: DiffOptions) -> LedgerResult<Changeset> {
        let recorded = self.ledger.head_snapshot()?;
        Ok(Differ::new(options).diff(&recorded, declared)?)
    }

    fn run(&self, steps: &[&MigrationStep], direction: Direction) -> LedgerResult<MigrationReport> {
        let from = self.current()?;
        let mut report = MigrationReport {
            direction,
            from: from.clone(),
            to: from,
            steps: Vec::new(),
            operations: 0,
        };
        if steps.is_empty() {
            log::info!("Database already at {}", describe(report.to.as_ref()));
            return Ok(report);
        }

        if self.transaction_per_step {
            for step in steps {
                let count =
                    with_transaction(self.db, |db| apply_step(db, step, direction))?;
                report.record(step, direction, count);
            }
        } else {
            let counts = with_transaction(self.db, |db| {
                steps
                    .iter()
                    .map(|step| apply_step(db, step, direction))
                    .collect::<LedgerResult<Vec<usize>>>()
            })?;
            for (step, count) in steps.iter().zip(counts) {
                report.record(step, direction, count);
            }
        }
        Ok(report)
    }
}

/// Pointer value once `step` has run in `direction`.
pub(crate) fn position_after(step: &MigrationStep, direction: Direction) -> Option<StepId> {
    match direction {
        Direction::Down => step.parent_id.clone(),
        Direction::Up | Direction::Stamp => Some(step.id.clone()),
    }
}

/// Run one step's operations and move the pointer past it.
fn apply_step(db: &dyn Database, step: &MigrationStep, direction: Direction) -> LedgerResult<usize> {
    let ops = match direction {
        Direction::Down => &step.reverse_ops,
        Direction::Up | Direction::Stamp => &step.forward_ops,
    };
    log::info!("Migrating {} {} ({})", direction, step.id, step.message);

    for (index, op) in ops.iter().enumerate() {
        log::debug!("  [{}] {}", index, op);
        db.apply(op).map_err(|source| ApplyError {
            step: step.id.clone(),
            direction,
            index,
            operation: op.to_string(),
            source,
        })?;
    }

    db.set_version(position_after(step, direction).as_ref())?;
    db.record_transition(&step.id, direction)?;
    Ok(ops.len())
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
