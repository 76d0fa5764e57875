//! Tidemark's own tables inside the `tidemark` schema.
//!
//! Layout changes are numbered DDL files. `tidemark.layout` records the
//! highest one applied, so reopening a database only runs newer files.

use crate::error::{DbError, DbResult};
use duckdb::Connection;

/// Numbered layout DDL, oldest first.
pub(crate) const LAYOUT: &[(i32, &str)] = &[
    (1, include_str!("ddl/v001_version.sql")),
    (2, include_str!("ddl/v002_applied_log.sql")),
];

/// Highest layout version applied to `conn`, or 0 for a fresh database.
pub(crate) fn layout_version(conn: &Connection) -> DbResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM tidemark.layout",
        [],
        |row| row.get(0),
    )
    .map_err(|e| DbError::ExecutionError(format!("failed to read tidemark layout: {e}")))
}

/// Bring the bookkeeping tables up to the latest layout.
///
/// Each layout file and its version row commit together.
pub(crate) fn upgrade_layout(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "CREATE SCHEMA IF NOT EXISTS tidemark;
         CREATE TABLE IF NOT EXISTS tidemark.layout (
             version    INTEGER PRIMARY KEY,
             applied_at TIMESTAMP NOT NULL DEFAULT now()
         );",
    )
    .map_err(|e| DbError::ExecutionError(format!("failed to create tidemark schema: {e}")))?;

    let current = layout_version(conn)?;
    for (version, ddl) in LAYOUT.iter().filter(|(v, _)| *v > current) {
        log::debug!("Upgrading tidemark layout to v{:03}", version);
        let batch = format!(
            "BEGIN TRANSACTION;\n{ddl}\nINSERT INTO tidemark.layout (version) VALUES ({version});\nCOMMIT;"
        );
        if let Err(e) = conn.execute_batch(&batch) {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::debug!("No transaction to roll back: {}", rollback);
            }
            return Err(DbError::ExecutionError(format!(
                "tidemark layout v{version:03} failed: {e}"
            )));
        }
    }
    Ok(())
}
