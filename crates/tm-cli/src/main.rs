//! Tidemark CLI - declarative schema migrations with a reversible ledger

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod context;

use cli::{Cli, Commands};
use commands::{check, current, history, init, migrate, stamp, upgrade};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match &cli.command {
        Commands::Init(args) => init::execute(args, &cli.global),
        Commands::Migrate(args) => migrate::execute(args, &cli.global),
        Commands::Upgrade(args) => upgrade::execute_upgrade(args, &cli.global),
        Commands::Downgrade(args) => upgrade::execute_downgrade(args, &cli.global),
        Commands::Current => current::execute(&cli.global),
        Commands::History(args) => history::execute(args, &cli.global),
        Commands::Show(args) => history::execute_show(args, &cli.global),
        Commands::Heads => history::execute_heads(&cli.global),
        Commands::Check(args) => check::execute(args, &cli.global),
        Commands::Stamp(args) => stamp::execute(args, &cli.global),
    }
}

/// `RUST_LOG` wins unless `--verbose` is given; the default is `warn`.
fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}
