//! DuckDB DDL rendering.
//!
//! Uniqueness and indexing are realized as named single-column indexes so
//! they can be read back from `duckdb_indexes()`:
//!
//! - `ix_<len>_<table>_<column>`: indexed column (`UNIQUE` when also unique)
//! - `uq_<len>_<table>_<column>`: unique, not indexed
//!
//! `<len>` is the length of the table name. Index names share one namespace
//! per schema, and without it `a.b_c` and `a_b.c` would both map to `a_b_c`.
//!
//! Primary-key columns never get a separate index. DuckDB cannot alter a
//! table that carries indexes, so every column-level operation rebuilds the
//! table: copy rows aside, recreate it with the new definition, copy rows
//! back, and restore the indexes.

use tm_core::{Column, ColumnName, ColumnType, Operation, OperationConflict, Table, TableName};

/// Scratch table used while rebuilding.
pub const REBUILD_TABLE: &str = "__tidemark_rebuild";

const INDEX_PREFIX: &str = "ix_";
const UNIQUE_PREFIX: &str = "uq_";

/// Double-quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL type for a logical column type.
pub fn type_sql(ty: &ColumnType) -> String {
    match ty {
        ColumnType::Integer => "INTEGER".to_string(),
        ColumnType::BigInteger => "BIGINT".to_string(),
        ColumnType::SmallInteger => "SMALLINT".to_string(),
        ColumnType::Float => "REAL".to_string(),
        ColumnType::Double => "DOUBLE".to_string(),
        ColumnType::Numeric { precision, scale } => format!("DECIMAL({},{})", precision, scale),
        ColumnType::Boolean => "BOOLEAN".to_string(),
        ColumnType::String { max_length: None } => "VARCHAR".to_string(),
        ColumnType::String {
            max_length: Some(n),
        } => format!("VARCHAR({})", n),
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::Time => "TIME".to_string(),
        ColumnType::DateTime => "TIMESTAMP".to_string(),
        ColumnType::Binary => "BLOB".to_string(),
        ColumnType::Uuid => "UUID".to_string(),
    }
}

/// Column definition inside `CREATE TABLE`.
pub fn column_sql(column: &Column) -> String {
    let mut sql = format!(
        "{} {}",
        quote_ident(&column.name),
        type_sql(&column.column_type)
    );
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default.sql_literal());
    }
    sql
}

/// How a column's unique/index flags are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// `ix_` index, plain
    Indexed,
    /// `ix_` index, unique
    UniqueIndexed,
    /// `uq_` index
    Unique,
}

impl IndexKind {
    /// Index kind for a column, if it needs one.
    pub fn for_column(column: &Column) -> Option<Self> {
        if column.primary_key {
            return None;
        }
        match (column.index, column.unique) {
            (true, true) => Some(IndexKind::UniqueIndexed),
            (true, false) => Some(IndexKind::Indexed),
            (false, true) => Some(IndexKind::Unique),
            (false, false) => None,
        }
    }

    /// Flags as `(unique, index)`.
    pub fn flags(self) -> (bool, bool) {
        match self {
            IndexKind::Indexed => (false, true),
            IndexKind::UniqueIndexed => (true, true),
            IndexKind::Unique => (true, false),
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            IndexKind::Indexed | IndexKind::UniqueIndexed => INDEX_PREFIX,
            IndexKind::Unique => UNIQUE_PREFIX,
        }
    }
}

/// Name of the index backing `column`'s flags.
pub fn index_name(table: &str, column: &Column) -> Option<String> {
    IndexKind::for_column(column).map(|kind| {
        format!(
            "{}{}_{}_{}",
            kind.prefix(),
            table.len(),
            table,
            column.name
        )
    })
}

/// Recover the column and the index prefix from an index name of `table`.
///
/// Returns `(column, is_ix)`; `None` for indexes not created by Tidemark.
pub fn parse_index_name(table: &str, index: &str) -> Option<(ColumnName, bool)> {
    let (is_ix, rest) = match index.strip_prefix(INDEX_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, index.strip_prefix(UNIQUE_PREFIX)?),
    };
    let (len, rest) = rest.split_once('_')?;
    if len != table.len().to_string() {
        return None;
    }
    let column = rest.strip_prefix(table)?.strip_prefix('_')?;
    ColumnName::try_new(column).map(|c| (c, is_ix))
}

fn create_index_sql(table: &str, column: &Column) -> Option<String> {
    let kind = IndexKind::for_column(column)?;
    let name = index_name(table, column)?;
    let unique = if kind.flags().0 { "UNIQUE " } else { "" };
    Some(format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        quote_ident(&name),
        quote_ident(table),
        quote_ident(&column.name)
    ))
}

fn drop_index_sql(table: &str, column: &Column) -> Option<String> {
    index_name(table, column).map(|name| format!("DROP INDEX IF EXISTS {}", quote_ident(&name)))
}

fn create_table_stmt(table: &Table) -> String {
    let mut defs: Vec<String> = table.columns.iter().map(column_sql).collect();
    if let Some(pk) = table.primary_key() {
        defs.push(format!("PRIMARY KEY ({})", quote_ident(&pk.name)));
    }
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(&table.name),
        defs.join(", ")
    )
}

fn create_indexes_sql(table: &Table) -> impl Iterator<Item = String> + '_ {
    table
        .columns
        .iter()
        .filter_map(|c| create_index_sql(&table.name, c))
}

/// `CREATE TABLE` followed by its indexes.
pub fn create_table_sql(table: &Table) -> Vec<String> {
    let mut statements = vec![create_table_stmt(table)];
    statements.extend(create_indexes_sql(table));
    statements
}

/// Index drops followed by `DROP TABLE`.
pub fn drop_table_sql(table: &Table) -> Vec<String> {
    let mut statements: Vec<String> = table
        .columns
        .iter()
        .filter_map(|c| drop_index_sql(&table.name, c))
        .collect();
    statements.push(format!("DROP TABLE {}", quote_ident(&table.name)));
    statements
}

/// Statements that turn the live table `before` into `after`, keeping rows.
///
/// Columns present in both are copied, with a cast when the type changed.
pub fn rebuild_table_sql(before: &Table, after: &Table) -> Vec<String> {
    let name = quote_ident(&before.name);
    let scratch = quote_ident(REBUILD_TABLE);

    let mut statements = vec![format!(
        "CREATE OR REPLACE TEMP TABLE {} AS SELECT * FROM {}",
        scratch, name
    )];
    statements.extend(drop_table_sql(before));
    statements.push(create_table_stmt(after));

    let mut targets = Vec::new();
    let mut sources = Vec::new();
    for column in &after.columns {
        if let Some(old) = before.column(&column.name) {
            let ident = quote_ident(&column.name);
            if old.column_type == column.column_type {
                sources.push(ident.clone());
            } else {
                sources.push(format!(
                    "CAST({} AS {})",
                    ident,
                    type_sql(&column.column_type)
                ));
            }
            targets.push(ident);
        }
    }
    if !targets.is_empty() {
        statements.push(format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            name,
            targets.join(", "),
            sources.join(", "),
            scratch
        ));
    }
    statements.push(format!("DROP TABLE {}", scratch));
    statements.extend(create_indexes_sql(after));
    statements
}

/// The table an operation leaves behind, computed from the live table.
///
/// Only presence is checked: the live definition may differ from the
/// recorded one in details the database does not preserve.
pub fn table_after(op: &Operation, current: &Table) -> Result<Table, OperationConflict> {
    let mut next = current.clone();
    match op {
        Operation::AddColumn { table, column } => {
            if current.has_column(&column.name) {
                return Err(OperationConflict::ColumnExists {
                    table: table.clone(),
                    column: column.name.clone(),
                });
            }
            next.columns.push(column.clone());
        }
        Operation::DropColumn { table, column } => {
            if !current.has_column(&column.name) {
                return Err(OperationConflict::ColumnMissing {
                    table: table.clone(),
                    column: column.name.clone(),
                });
            }
            next.columns.retain(|c| c.name != column.name);
        }
        Operation::AlterColumn { table, from, to } => {
            if from.name != to.name {
                return Err(OperationConflict::RenameUnsupported {
                    table: table.clone(),
                    from: from.name.clone(),
                    to: to.name.clone(),
                });
            }
            let slot = next
                .columns
                .iter_mut()
                .find(|c| c.name == from.name)
                .ok_or_else(|| OperationConflict::ColumnMissing {
                    table: table.clone(),
                    column: from.name.clone(),
                })?;
            *slot = to.clone();
        }
        Operation::CreateTable { table } => {
            return Err(OperationConflict::TableExists {
                table: table.name.clone(),
            })
        }
        Operation::DropTable { .. } => {}
    }
    Ok(next)
}

/// Statements for `op`, given the live definition of the table it touches.
pub fn plan(op: &Operation, current: Option<&Table>) -> Result<Vec<String>, OperationConflict> {
    let missing = |name: &TableName| OperationConflict::TableMissing {
        table: name.clone(),
    };
    match (op, current) {
        (Operation::CreateTable { table }, None) => Ok(create_table_sql(table)),
        (Operation::CreateTable { table }, Some(_)) => Err(OperationConflict::TableExists {
            table: table.name.clone(),
        }),
        (Operation::DropTable { .. }, Some(live)) => Ok(drop_table_sql(live)),
        (_, None) => Err(missing(op.table_name())),
        (_, Some(live)) => Ok(rebuild_table_sql(live, &table_after(op, live)?)),
    }
}

#[cfg(test)]
#[path = "sql_test.rs"]
mod tests;
