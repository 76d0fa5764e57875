//! Current command implementation

use anyhow::Result;
use tm_ledger::Migrator;

use crate::cli::GlobalArgs;
use crate::context::CommandContext;

/// Execute the current command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let ledger = ctx.open_ledger()?;
    let db = ctx.open_database()?;
    let migrator = Migrator::new(&ledger, db.as_ref());

    match migrator.current()? {
        None => println!("base"),
        Some(id) => {
            let message = ledger.get(&id).map_or("", |s| s.message.as_str());
            let head = if ledger.head_id() == Some(&id) {
                " (head)"
            } else {
                ""
            };
            println!("{}{}  {}", id, head, message);
        }
    }

    let pending = migrator.pending()?.len();
    if pending > 0 {
        println!("{} step(s) pending", pending);
    }
    Ok(())
}
