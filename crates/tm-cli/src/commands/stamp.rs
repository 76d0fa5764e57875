//! Stamp command implementation

use anyhow::{Context, Result};
use tm_ledger::{Migrator, Target};

use crate::cli::{GlobalArgs, StampArgs};
use crate::commands::common::print_report;
use crate::context::CommandContext;

/// Execute the stamp command
pub(crate) fn execute(args: &StampArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let target: Target = args.target.parse()?;
    let ledger = ctx.open_ledger()?;
    let db = ctx.open_database()?;

    let report = Migrator::new(&ledger, db.as_ref())
        .stamp(&target)
        .with_context(|| format!("Failed to stamp {}", target))?;
    print_report(&report, &ledger);
    Ok(())
}
