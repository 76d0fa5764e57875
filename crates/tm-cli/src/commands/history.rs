//! History, show, and heads commands

use anyhow::{Context, Result};
use tm_core::{MigrationStep, StepId};
use tm_db::Database;
use tm_ledger::{Ledger, Migrator};

use crate::cli::{GlobalArgs, HistoryArgs, OutputFormat, ShowArgs};
use crate::commands::common::{format_time, position, print_table};
use crate::context::CommandContext;

/// Execute the history command
pub(crate) fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let ledger = ctx.open_ledger()?;
    let db = ctx.open_database()?;

    if args.log {
        return print_applied_log(db.as_ref(), args.output);
    }

    match args.output {
        OutputFormat::Json => {
            let steps: Vec<&MigrationStep> = ledger.steps().iter().rev().collect();
            println!("{}", serde_json::to_string_pretty(&steps)?);
        }
        OutputFormat::Table => {
            let current = current_or_warn(&ledger, db.as_ref());
            print_steps(&ledger, current.as_ref());
        }
    }
    Ok(())
}

/// Database position for display; an unreadable position is shown as unknown.
fn current_or_warn(ledger: &Ledger, db: &dyn Database) -> Option<Option<StepId>> {
    match Migrator::new(ledger, db).current() {
        Ok(current) => Some(current),
        Err(e) => {
            log::warn!("Cannot determine the database position: {}", e);
            None
        }
    }
}

fn print_steps(ledger: &Ledger, current: Option<&Option<StepId>>) {
    if ledger.is_empty() {
        println!("No steps recorded.");
        return;
    }

    let applied = current.and_then(|c| ledger.applied_count(c.as_ref()));
    let rows: Vec<Vec<String>> = ledger
        .steps()
        .iter()
        .enumerate()
        .rev()
        .map(|(i, step)| {
            let mut markers = Vec::new();
            if ledger.head_id() == Some(&step.id) {
                markers.push("head");
            }
            if current.and_then(Option::as_ref) == Some(&step.id) {
                markers.push("current");
            }
            let status = match applied {
                Some(n) if i < n => "applied",
                Some(_) => "pending",
                None => "unknown",
            };
            vec![
                step.id.to_string(),
                position(step.parent_id.as_ref()),
                format_time(&step.created_at),
                status.to_string(),
                markers.join(","),
                step.message.clone(),
            ]
        })
        .collect();

    print_table(
        &["ID", "PARENT", "CREATED", "STATUS", "", "MESSAGE"],
        &rows,
    );
}

fn print_applied_log(db: &dyn Database, output: OutputFormat) -> Result<()> {
    let transitions = db.transitions().context("Failed to read the applied log")?;
    match output {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = transitions
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "step_id": t.step_id,
                        "direction": t.direction.to_string(),
                        "applied_at": t.applied_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Table => {
            if transitions.is_empty() {
                println!("No transitions recorded.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = transitions
                .iter()
                .map(|t| {
                    vec![
                        format_time(&t.applied_at),
                        t.direction.to_string(),
                        t.step_id.to_string(),
                    ]
                })
                .collect();
            print_table(&["APPLIED AT", "DIRECTION", "STEP"], &rows);
        }
    }
    Ok(())
}

/// Execute the show command
pub(crate) fn execute_show(args: &ShowArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let ledger = ctx.open_ledger()?;
    let step = ledger.find(&args.id)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(step)?),
        OutputFormat::Table => {
            println!("Step:     {}", step.id);
            println!("Parent:   {}", position(step.parent_id.as_ref()));
            println!("Created:  {}", format_time(&step.created_at));
            println!("Message:  {}", step.message);
            if let Some(path) = ledger.path_of(&step.id) {
                println!("File:     {}", path.display());
            }
            println!("\nForward:");
            for (i, op) in step.forward_ops.iter().enumerate() {
                println!("  {}. {}", i + 1, op);
            }
            println!("\nReverse:");
            for (i, op) in step.reverse_ops.iter().enumerate() {
                println!("  {}. {}", i + 1, op);
            }
        }
    }
    Ok(())
}

/// Execute the heads command
pub(crate) fn execute_heads(global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let ledger = ctx.open_ledger()?;
    match ledger.head() {
        Some(step) => println!("{} (head)  {}", step.id, step.message),
        None => println!("No steps recorded."),
    }
    Ok(())
}
