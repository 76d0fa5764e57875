//! Schema differ
//!
//! Compares two snapshots and produces the ordered operations that turn the
//! old schema into the new one, together with their exact inverses.

use crate::error::{DiffError, DiffResult};
use crate::operation::{invert_all, Operation};
use crate::schema::{Column, SchemaSnapshot, Table};
use crate::step::{MigrationStep, StepId};
use serde::{Deserialize, Serialize};

/// Options controlling how ambiguous changes are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Treat a removed table/column and an added one with an identical
    /// definition as a drop followed by a create instead of failing.
    pub assume_drop_create: bool,
}

/// Forward operations and their inverses.
///
/// `reverse` is stored in execution order: replaying `forward` then
/// `reverse` restores the original schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    pub forward: Vec<Operation>,
    pub reverse: Vec<Operation>,
}

impl Changeset {
    /// Build a changeset from forward operations, deriving the reverse list.
    pub fn from_forward(forward: Vec<Operation>) -> Self {
        let reverse = invert_all(&forward);
        Self { forward, reverse }
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }
}

/// Diff two snapshots with default options.
pub fn diff(old: &SchemaSnapshot, new: &SchemaSnapshot) -> DiffResult<Changeset> {
    Differ::default().diff(old, new)
}

/// Schema differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct Differ {
    options: DiffOptions,
}

impl Differ {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Compute the changeset turning `old` into `new`.
    pub fn diff(&self, old: &SchemaSnapshot, new: &SchemaSnapshot) -> DiffResult<Changeset> {
        let created: Vec<&Table> = new.tables().filter(|t| !old.has_table(&t.name)).collect();
        let dropped: Vec<&Table> = old.tables().filter(|t| !new.has_table(&t.name)).collect();

        if !self.options.assume_drop_create {
            for gone in &dropped {
                if let Some(added) = created.iter().find(|t| t.same_columns(gone)) {
                    return Err(DiffError::AmbiguousTableRename {
                        from: gone.name.clone(),
                        to: added.name.clone(),
                    });
                }
            }
        }

        let mut forward: Vec<Operation> = created
            .iter()
            .map(|t| Operation::CreateTable {
                table: (*t).clone(),
            })
            .collect();

        for old_table in old.tables() {
            if let Some(new_table) = new.table(&old_table.name) {
                self.diff_table(old_table, new_table, &mut forward)?;
            }
        }

        forward.extend(dropped.iter().map(|t| Operation::DropTable {
            table: (*t).clone(),
        }));

        // Stable: keeps table-name order within each phase.
        forward.sort_by_key(Operation::phase);

        log::debug!(
            "Diff produced {} operation(s): {} table(s) created, {} dropped",
            forward.len(),
            created.len(),
            dropped.len()
        );
        Ok(Changeset::from_forward(forward))
    }

    /// Diff and wrap the result in a migration step chained after `parent`.
    pub fn step(
        &self,
        old: &SchemaSnapshot,
        new: &SchemaSnapshot,
        parent: Option<StepId>,
        message: &str,
    ) -> DiffResult<MigrationStep> {
        let changeset = self.diff(old, new)?;
        Ok(MigrationStep::new(parent, message, changeset)?)
    }

    fn diff_table(&self, old: &Table, new: &Table, out: &mut Vec<Operation>) -> DiffResult<()> {
        let old_pk = old.primary_key().map(|c| &c.name);
        let new_pk = new.primary_key().map(|c| &c.name);
        if old_pk != new_pk {
            return Err(DiffError::PrimaryKeyChanged {
                table: old.name.clone(),
                from: old_pk.map_or_else(|| "none".to_string(), |n| n.to_string()),
                to: new_pk.map_or_else(|| "none".to_string(), |n| n.to_string()),
            });
        }

        let added: Vec<&Column> = new
            .columns
            .iter()
            .filter(|c| !old.has_column(&c.name))
            .collect();
        let removed: Vec<&Column> = old
            .columns
            .iter()
            .filter(|c| !new.has_column(&c.name))
            .collect();

        if !self.options.assume_drop_create {
            for gone in &removed {
                if let Some(fresh) = added.iter().find(|c| c.same_definition(gone)) {
                    return Err(DiffError::AmbiguousColumnRename {
                        table: old.name.clone(),
                        from: gone.name.clone(),
                        to: fresh.name.clone(),
                    });
                }
            }
        }

        out.extend(added.iter().map(|c| Operation::AddColumn {
            table: new.name.clone(),
            column: (*c).clone(),
        }));

        for new_col in &new.columns {
            if let Some(old_col) = old.column(&new_col.name) {
                if old_col != new_col {
                    out.push(Operation::AlterColumn {
                        table: new.name.clone(),
                        from: old_col.clone(),
                        to: new_col.clone(),
                    });
                }
            }
        }

        out.extend(removed.iter().map(|c| Operation::DropColumn {
            table: old.name.clone(),
            column: (*c).clone(),
        }));
        Ok(())
    }
}

#[cfg(test)]
#[path = "diff_test.rs"]
mod tests;
