//! Shared helpers for CLI commands

use chrono::{DateTime, Utc};
use tm_core::StepId;
use tm_ledger::{Ledger, MigrationReport};

/// `base` for no step, otherwise the id.
pub(crate) fn position(id: Option<&StepId>) -> String {
    id.map_or_else(|| "base".to_string(), |id| id.to_string())
}

/// Timestamp as shown in tables.
pub(crate) fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Print what an upgrade, downgrade, or stamp did.
pub(crate) fn print_report(report: &MigrationReport, ledger: &Ledger) {
    if report.is_noop() && report.steps.is_empty() {
        println!("Database already at {}", position(report.to.as_ref()));
        return;
    }
    for id in &report.steps {
        let message = ledger.get(id).map_or("", |s| s.message.as_str());
        println!("  {:<5} {}  {}", report.direction, id, message);
    }
    println!(
        "Database moved from {} to {} ({} step(s), {} operation(s))",
        position(report.from.as_ref()),
        position(report.to.as_ref()),
        report.steps.len(),
        report.operations
    );
}

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a left-aligned table with a dashed separator under the header.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);
    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(headers.iter().map(|h| h.to_string()).collect()));
    println!("{}", line(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        println!("{}", line(row.clone()));
    }
}
