//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tidemark - declarative schema migrations with a reversible ledger
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Named target from tidemark.yml (also TIDEMARK_TARGET)
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Override the database path of the selected target
    #[arg(long, global = true, env = "TIDEMARK_DATABASE")]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create tidemark.yml, the schema directory, and an empty ledger
    Init(InitArgs),

    /// Record the difference between the declared schema and the ledger head
    Migrate(MigrateArgs),

    /// Apply recorded steps to the database
    Upgrade(UpgradeArgs),

    /// Revert applied steps
    Downgrade(DowngradeArgs),

    /// Show the step the database is at
    Current,

    /// List recorded steps, newest first
    History(HistoryArgs),

    /// Show one step in detail
    Show(ShowArgs),

    /// Show the ledger head
    Heads,

    /// Fail if the declared schema has unrecorded changes
    Check(CheckArgs),

    /// Set the database position without running any DDL
    Stamp(StampArgs),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project name (default: the project directory name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// DuckDB file for the default database
    #[arg(long, default_value = "app.duckdb")]
    pub database_path: String,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Description of the change
    #[arg(short, long)]
    pub message: String,

    /// Record a step even when nothing changed
    #[arg(long)]
    pub allow_empty: bool,

    /// Treat a removed and an added table/column with the same definition as
    /// drop + create instead of failing
    #[arg(long)]
    pub assume_drop_create: bool,
}

/// Arguments for the upgrade command
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// head, a step id or prefix, or +N
    #[arg(default_value = "head")]
    pub target: String,

    /// Print the SQL instead of running it
    #[arg(long)]
    pub sql: bool,
}

/// Arguments for the downgrade command
#[derive(Args, Debug)]
pub struct DowngradeArgs {
    /// base, a step id or prefix, or -N
    #[arg(allow_hyphen_values = true)]
    pub target: String,

    /// Print the SQL instead of running it
    #[arg(long)]
    pub sql: bool,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Show the database's applied log instead of the ledger
    #[arg(long)]
    pub log: bool,
}

/// Arguments for the show command
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Step id or unique prefix
    pub id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Treat ambiguous renames as drop + create
    #[arg(long)]
    pub assume_drop_create: bool,
}

/// Arguments for the stamp command
#[derive(Args, Debug)]
pub struct StampArgs {
    /// head, base, a step id or prefix, or +N/-N
    #[arg(allow_hyphen_values = true)]
    pub target: String,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
