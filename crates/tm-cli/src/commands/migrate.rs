//! Migrate command implementation - records a new ledger step

use anyhow::{Context, Result};
use tm_core::DiffOptions;
use tm_ledger::RecordOptions;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::context::CommandContext;

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let declared = ctx.declared_schema()?;
    let mut ledger = ctx.open_ledger()?;

    let options = RecordOptions {
        allow_empty: args.allow_empty,
        diff: DiffOptions {
            assume_drop_create: args.assume_drop_create,
        },
    };
    let recorded = ledger
        .record(&declared, &args.message, options)
        .context("Failed to record migration step")?;

    let Some(step) = recorded else {
        println!("No changes detected; nothing recorded.");
        return Ok(());
    };

    println!(
        "Recorded step {} \"{}\" ({} operation(s))",
        step.id,
        step.message,
        step.forward_ops.len()
    );
    for op in &step.forward_ops {
        println!("  + {}", op);
    }
    if let Some(path) = ledger.path_of(&step.id) {
        println!("Written to {}", path.display());
    }
    Ok(())
}
