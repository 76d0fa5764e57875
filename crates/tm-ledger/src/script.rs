//! Offline SQL scripts
//!
//! Renders the statements an upgrade or downgrade would execute, tracking the
//! recorded schema op by op so each statement sees the table it changes.

use crate::error::{describe, LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::migrator::position_after;
use tm_core::MigrationStep;
use tm_db::{Database, Direction};

/// Render `steps` as a SQL script in execution order.
pub fn render_script(
    ledger: &Ledger,
    db: &dyn Database,
    steps: &[&MigrationStep],
    direction: Direction,
    transaction_per_step: bool,
) -> LedgerResult<String> {
    let (Some(first), Some(last)) = (steps.first(), steps.last()) else {
        return Ok(String::new());
    };

    let start = match direction {
        Direction::Down => Some(&first.id),
        Direction::Up | Direction::Stamp => first.parent_id.as_ref(),
    };
    let end = position_after(last, direction);
    let mut schema = ledger.snapshot_at(start)?;

    let transactional = db.supports_transactions();
    let mut lines = vec![format!(
        "-- tidemark {} {} -> {} ({})",
        direction,
        describe(start),
        describe(end.as_ref()),
        db.db_type()
    )];
    if transactional && !transaction_per_step {
        lines.push("BEGIN TRANSACTION;".to_string());
    }

    for step in steps {
        lines.push(String::new());
        lines.push(format!("-- Step {}: {}", step.id, step.message));
        if transactional && transaction_per_step {
            lines.push("BEGIN TRANSACTION;".to_string());
        }

        let ops = match direction {
            Direction::Down => &step.reverse_ops,
            Direction::Up | Direction::Stamp => &step.forward_ops,
        };
        for op in ops {
            lines.extend(db.render(op, &schema)?.into_iter().map(terminate));
            schema = schema
                .apply(std::slice::from_ref(op))
                .map_err(|source| LedgerError::Replay {
                    step: step.id.clone(),
                    source,
                })?;
        }
        let position = position_after(step, direction);
        lines.extend(
            db.render_set_version(position.as_ref())
                .into_iter()
                .map(terminate),
        );

        if transactional && transaction_per_step {
            lines.push("COMMIT;".to_string());
        }
    }

    if transactional && !transaction_per_step {
        lines.push(String::new());
        lines.push("COMMIT;".to_string());
    }
    lines.push(String::new());
    Ok(lines.join("\n"))
}

fn terminate(statement: String) -> String {
    if statement.starts_with("--") {
        statement
    } else {
        format!("{};", statement)
    }
}
