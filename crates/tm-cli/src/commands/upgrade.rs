//! Upgrade and downgrade commands

use anyhow::{Context, Result};
use tm_db::Direction;
use tm_ledger::{Migrator, Target};

use crate::cli::{DowngradeArgs, GlobalArgs, UpgradeArgs};
use crate::commands::common::print_report;
use crate::context::CommandContext;

/// Execute the upgrade command
pub(crate) fn execute_upgrade(args: &UpgradeArgs, global: &GlobalArgs) -> Result<()> {
    migrate(&args.target, args.sql, Direction::Up, global)
}

/// Execute the downgrade command
pub(crate) fn execute_downgrade(args: &DowngradeArgs, global: &GlobalArgs) -> Result<()> {
    migrate(&args.target, args.sql, Direction::Down, global)
}

fn migrate(target: &str, sql: bool, direction: Direction, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let target: Target = target.parse()?;
    let ledger = ctx.open_ledger()?;
    let db = ctx.open_database()?;
    let migrator = Migrator::new(&ledger, db.as_ref())
        .with_transaction_per_step(ctx.transaction_per_step()?);

    if sql {
        let script = match direction {
            Direction::Down => migrator.downgrade_sql(&target),
            _ => migrator.upgrade_sql(&target),
        }
        .context("Failed to render migration script")?;
        print!("{}", script);
        return Ok(());
    }

    let report = match direction {
        Direction::Down => migrator.downgrade(&target),
        _ => migrator.upgrade(&target),
    }
    .with_context(|| format!("Failed to migrate {} to {}", direction, target))?;

    print_report(&report, &ledger);
    Ok(())
}
