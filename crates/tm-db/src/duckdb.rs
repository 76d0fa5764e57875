//! DuckDB database backend implementation

use crate::bookkeeping::upgrade_layout;
use crate::error::{DbError, DbResult};
use crate::sql;
use crate::traits::{Database, Direction, Transition};
use chrono::DateTime;
use duckdb::Connection;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tm_core::config::MEMORY_DB_PATH;
use tm_core::{
    Column, ColumnName, ColumnType, DefaultValue, Operation, SchemaSnapshot, StepId, Table,
    TableName,
};

/// DuckDB database backend
///
/// User tables live in the `main` schema; the position pointer and the
/// applied log live in the `tidemark` schema, created on open.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

/// One row of `duckdb_columns()`.
struct LiveColumn {
    table: String,
    name: String,
    data_type: String,
    nullable: bool,
    default: Option<String>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Self::with_connection(conn)
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == MEMORY_DB_PATH {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn with_connection(conn: Connection) -> DbResult<Self> {
        upgrade_layout(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute raw SQL. Used for seeding data around migrations.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Count rows of a query
    pub fn query_count(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

/// Run one statement, keeping the statement text in execution errors.
fn execute(conn: &Connection, statement: &str) -> DbResult<()> {
    log::debug!("Executing: {}", statement);
    conn.execute_batch(statement).map_err(|e| match DbError::from(e) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{msg}: {statement}")),
        other => other,
    })
}

/// Read user tables from the `main` schema, optionally a single one.
fn read_tables(conn: &Connection, only: Option<&TableName>) -> DbResult<Vec<Table>> {
    // Table names are validated identifiers, so inlining them is safe.
    let filter = only.map_or_else(String::new, |t| format!(" AND table_name = '{}'", t));
    let scope = "database_name = current_database() AND schema_name = 'main'";

    let columns = query_columns(conn, scope, &filter)?;
    let keys = query_primary_keys(conn, scope, &filter)?;
    let indexes = query_indexes(conn, scope, &filter)?;

    let mut tables: BTreeMap<String, Vec<Column>> = BTreeMap::new();
    for live in columns {
        let unsupported = || DbError::UnsupportedType {
            table: live.table.clone(),
            column: live.name.clone(),
            type_name: live.data_type.clone(),
        };
        let column_type: ColumnType = live.data_type.parse().map_err(|_| unsupported())?;
        let name = ColumnName::try_new(live.name.as_str()).ok_or_else(|| {
            DbError::Introspection(format!(
                "column '{}.{}' is not a plain identifier",
                live.table, live.name
            ))
        })?;
        let primary_key = keys.contains(&(live.table.clone(), live.name.clone()));
        let column = Column {
            name,
            column_type,
            nullable: live.nullable && !primary_key,
            unique: false,
            index: false,
            default: live.default.as_deref().map(DefaultValue::from_sql),
            primary_key,
        };
        tables.entry(live.table).or_default().push(column);
    }

    for (table, index_name, is_unique) in indexes {
        let Some(columns) = tables.get_mut(&table) else {
            continue;
        };
        let Some((column, is_ix)) = sql::parse_index_name(&table, &index_name) else {
            log::debug!("Ignoring unmanaged index {} on {}", index_name, table);
            continue;
        };
        if let Some(col) = columns.iter_mut().find(|c| c.name == column) {
            col.index = is_ix;
            col.unique = is_unique;
        }
    }

    tables
        .into_iter()
        .map(|(name, columns)| {
            let name = TableName::try_new(name.as_str()).ok_or_else(|| {
                DbError::Introspection(format!("table '{}' is not a plain identifier", name))
            })?;
            Ok(Table { name, columns })
        })
        .collect()
}

fn query_columns(conn: &Connection, scope: &str, filter: &str) -> DbResult<Vec<LiveColumn>> {
    let query = format!(
        "SELECT table_name, column_name, data_type, is_nullable, column_default
         FROM duckdb_columns()
         WHERE {scope} AND NOT internal{filter}
           AND table_name IN (
               SELECT table_name FROM duckdb_tables() WHERE {scope} AND NOT temporary
           )
         ORDER BY table_name, column_index"
    );
    let mut stmt = conn
        .prepare(&query)
        .map_err(|e| DbError::Introspection(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(LiveColumn {
                table: row.get(0)?,
                name: row.get(1)?,
                data_type: row.get(2)?,
                nullable: row.get(3)?,
                default: row.get(4)?,
            })
        })
        .map_err(|e| DbError::Introspection(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbError::Introspection(e.to_string()))?;
    Ok(rows)
}

fn query_primary_keys(
    conn: &Connection,
    scope: &str,
    filter: &str,
) -> DbResult<HashSet<(String, String)>> {
    let query = format!(
        "SELECT table_name, unnest(constraint_column_names)
         FROM duckdb_constraints()
         WHERE {scope} AND constraint_type = 'PRIMARY KEY'{filter}"
    );
    let mut stmt = conn
        .prepare(&query)
        .map_err(|e| DbError::Introspection(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| DbError::Introspection(e.to_string()))?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(|e| DbError::Introspection(e.to_string()))?;
    Ok(rows)
}

fn query_indexes(
    conn: &Connection,
    scope: &str,
    filter: &str,
) -> DbResult<Vec<(String, String, bool)>> {
    let query = format!(
        "SELECT table_name, index_name, is_unique
         FROM duckdb_indexes()
         WHERE {scope}{filter}"
    );
    let mut stmt = conn
        .prepare(&query)
        .map_err(|e| DbError::Introspection(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })
        .map_err(|e| DbError::Introspection(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbError::Introspection(e.to_string()))?;
    Ok(rows)
}

fn parse_step_id(raw: String) -> DbResult<StepId> {
    StepId::try_from(raw).map_err(DbError::Introspection)
}

impl Database for DuckDbBackend {
    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    fn apply(&self, op: &Operation) -> DbResult<()> {
        let conn = self.lock()?;
        let current = read_tables(&conn, Some(op.table_name()))?.pop();
        let statements = sql::plan(op, current.as_ref())?;
        for statement in &statements {
            execute(&conn, statement)?;
        }
        Ok(())
    }

    fn render(&self, op: &Operation, before: &SchemaSnapshot) -> DbResult<Vec<String>> {
        Ok(sql::plan(op, before.table(op.table_name()))?)
    }

    fn introspect(&self) -> DbResult<SchemaSnapshot> {
        let conn = self.lock()?;
        Ok(SchemaSnapshot::new(read_tables(&conn, None)?))
    }

    fn current_version(&self) -> DbResult<Option<StepId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT step_id FROM tidemark.version LIMIT 1")?;
        let mut ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.pop().map(parse_step_id).transpose()
    }

    fn set_version(&self, version: Option<&StepId>) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM tidemark.version", [])?;
        if let Some(id) = version {
            conn.execute(
                "INSERT INTO tidemark.version (step_id) VALUES (?)",
                duckdb::params![id.as_str()],
            )?;
        }
        Ok(())
    }

    fn render_set_version(&self, version: Option<&StepId>) -> Vec<String> {
        let mut statements = vec!["DELETE FROM tidemark.version".to_string()];
        if let Some(id) = version {
            // Step ids are alphanumeric, so inlining is safe.
            statements.push(format!(
                "INSERT INTO tidemark.version (step_id) VALUES ('{}')",
                id
            ));
        }
        statements
    }

    fn record_transition(&self, step: &StepId, direction: Direction) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tidemark.applied_log (step_id, direction) VALUES (?, ?)",
            duckdb::params![step.as_str(), direction.to_string()],
        )?;
        Ok(())
    }

    fn transitions(&self) -> DbResult<Vec<Transition>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT step_id, direction, epoch_ms(applied_at)
             FROM tidemark.applied_log ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(step_id, direction, millis)| {
                Ok(Transition {
                    step_id: parse_step_id(step_id)?,
                    direction: direction.parse().map_err(DbError::Introspection)?,
                    applied_at: DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                        DbError::Introspection(format!("invalid timestamp {}", millis))
                    })?,
                })
            })
            .collect()
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn begin(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    fn commit(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    fn rollback(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
