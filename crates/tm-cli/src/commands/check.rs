//! Check command implementation - fails on unrecorded schema changes

use anyhow::Result;
use tm_core::DiffOptions;
use tm_ledger::Migrator;

use crate::cli::{CheckArgs, GlobalArgs};
use crate::context::CommandContext;

/// Execute the check command
pub(crate) fn execute(args: &CheckArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let declared = ctx.declared_schema()?;
    let ledger = ctx.open_ledger()?;
    let db = ctx.open_database()?;
    let migrator = Migrator::new(&ledger, db.as_ref());

    let changes = migrator.check(
        &declared,
        DiffOptions {
            assume_drop_create: args.assume_drop_create,
        },
    )?;

    let pending = migrator.pending()?.len();
    if pending > 0 {
        println!("Database is {} step(s) behind the ledger head", pending);
    }

    if changes.is_empty() {
        println!("No unrecorded changes.");
        return Ok(());
    }

    println!("Unrecorded changes:");
    for op in &changes.forward {
        println!("  + {}", op);
    }
    anyhow::bail!(
        "{} change(s) not recorded in the ledger. Run 'tidemark migrate -m <message>'",
        changes.len()
    )
}
