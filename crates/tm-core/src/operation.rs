//! Structural operations that make up a migration step.
//!
//! Operations are plain data: every variant carries enough of the schema to
//! compute its exact inverse, so a step's reverse list never needs the
//! database to be consulted.

use crate::error::OperationConflict;
use crate::schema::{Column, SchemaSnapshot, Table, TableName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One structural change to a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Create a table with all of its columns
    CreateTable { table: Table },
    /// Drop a table; carries the full definition so it can be recreated
    DropTable { table: Table },
    /// Add a column to an existing table
    AddColumn { table: TableName, column: Column },
    /// Drop a column; carries the full definition so it can be re-added
    DropColumn { table: TableName, column: Column },
    /// Change a column's type or constraints
    AlterColumn {
        table: TableName,
        from: Column,
        to: Column,
    },
}

/// Execution phase of an operation within a step.
///
/// Creations run before column additions, which run before alterations,
/// then column drops, then table drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    CreateTable,
    AddColumn,
    AlterColumn,
    DropColumn,
    DropTable,
}

impl Operation {
    /// The phase this operation belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            Operation::CreateTable { .. } => Phase::CreateTable,
            Operation::AddColumn { .. } => Phase::AddColumn,
            Operation::AlterColumn { .. } => Phase::AlterColumn,
            Operation::DropColumn { .. } => Phase::DropColumn,
            Operation::DropTable { .. } => Phase::DropTable,
        }
    }

    /// Name of the table the operation touches.
    pub fn table_name(&self) -> &TableName {
        match self {
            Operation::CreateTable { table } | Operation::DropTable { table } => &table.name,
            Operation::AddColumn { table, .. }
            | Operation::DropColumn { table, .. }
            | Operation::AlterColumn { table, .. } => table,
        }
    }

    /// The operation that undoes this one.
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::CreateTable { table } => Operation::DropTable {
                table: table.clone(),
            },
            Operation::DropTable { table } => Operation::CreateTable {
                table: table.clone(),
            },
            Operation::AddColumn { table, column } => Operation::DropColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Operation::DropColumn { table, column } => Operation::AddColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Operation::AlterColumn { table, from, to } => Operation::AlterColumn {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            },
        }
    }

    /// Apply the operation to a mutable table map, checking that the schema
    /// is in the state the operation expects.
    fn apply_to(&self, schema: &mut SchemaSnapshot) -> Result<(), OperationConflict> {
        let tables = schema.tables_mut();
        match self {
            Operation::CreateTable { table } => {
                if tables.contains_key(&table.name) {
                    return Err(OperationConflict::TableExists {
                        table: table.name.clone(),
                    });
                }
                tables.insert(table.name.clone(), table.clone());
            }
            Operation::DropTable { table } => {
                let existing =
                    tables
                        .get(&table.name)
                        .ok_or_else(|| OperationConflict::TableMissing {
                            table: table.name.clone(),
                        })?;
                if existing != table {
                    return Err(OperationConflict::TableMismatch {
                        table: table.name.clone(),
                    });
                }
                tables.remove(&table.name);
            }
            Operation::AddColumn { table, column } => {
                let existing = tables
                    .get_mut(table)
                    .ok_or_else(|| OperationConflict::TableMissing {
                        table: table.clone(),
                    })?;
                if existing.has_column(&column.name) {
                    return Err(OperationConflict::ColumnExists {
                        table: table.clone(),
                        column: column.name.clone(),
                    });
                }
                existing.columns.push(column.clone());
            }
            Operation::DropColumn { table, column } => {
                let existing = tables
                    .get_mut(table)
                    .ok_or_else(|| OperationConflict::TableMissing {
                        table: table.clone(),
                    })?;
                let pos = existing.column_position(&column.name).ok_or_else(|| {
                    OperationConflict::ColumnMissing {
                        table: table.clone(),
                        column: column.name.clone(),
                    }
                })?;
                if existing.columns[pos] != *column {
                    return Err(OperationConflict::ColumnMismatch {
                        table: table.clone(),
                        column: column.name.clone(),
                    });
                }
                existing.columns.remove(pos);
            }
            Operation::AlterColumn { table, from, to } => {
                if from.name != to.name {
                    return Err(OperationConflict::RenameUnsupported {
                        table: table.clone(),
                        from: from.name.clone(),
                        to: to.name.clone(),
                    });
                }
                let existing = tables
                    .get_mut(table)
                    .ok_or_else(|| OperationConflict::TableMissing {
                        table: table.clone(),
                    })?;
                let pos = existing.column_position(&from.name).ok_or_else(|| {
                    OperationConflict::ColumnMissing {
                        table: table.clone(),
                        column: from.name.clone(),
                    }
                })?;
                if existing.columns[pos] != *from {
                    return Err(OperationConflict::ColumnMismatch {
                        table: table.clone(),
                        column: from.name.clone(),
                    });
                }
                existing.columns[pos] = to.clone();
            }
        }
        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateTable { table } => {
                let columns: Vec<String> = table.columns.iter().map(|c| c.to_string()).collect();
                write!(f, "create table {} ({})", table.name, columns.join(", "))
            }
            Operation::DropTable { table } => write!(f, "drop table {}", table.name),
            Operation::AddColumn { table, column } => {
                write!(f, "add column {}.{}", table, column)
            }
            Operation::DropColumn { table, column } => {
                write!(f, "drop column {}.{}", table, column.name)
            }
            Operation::AlterColumn { table, from, to } => {
                write!(
                    f,
                    "alter column {}.{}: {}",
                    table,
                    to.name,
                    to.changes_from(from).join(", ")
                )
            }
        }
    }
}

impl SchemaSnapshot {
    /// Return a new snapshot with `ops` applied in order.
    ///
    /// Fails on the first operation that does not fit the schema; `self` is
    /// never modified.
    pub fn apply(&self, ops: &[Operation]) -> Result<SchemaSnapshot, OperationConflict> {
        let mut next = self.clone();
        for op in ops {
            op.apply_to(&mut next)?;
        }
        next.touch();
        Ok(next)
    }
}

/// Build the reverse list for `forward`: each inverse, in reverse order.
pub fn invert_all(forward: &[Operation]) -> Vec<Operation> {
    forward.iter().rev().map(Operation::inverse).collect()
}

#[cfg(test)]
#[path = "operation_test.rs"]
mod tests;
