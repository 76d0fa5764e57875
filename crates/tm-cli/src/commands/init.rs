//! Init command implementation - sets up a Tidemark project

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tm_core::config::CONFIG_FILE_NAMES;
use tm_core::Config;
use tm_ledger::Ledger;

use crate::cli::{GlobalArgs, InitArgs};

/// Execute the init command
pub(crate) fn execute(args: &InitArgs, global: &GlobalArgs) -> Result<()> {
    let root = Path::new(&global.project_dir);
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create directory: {}", root.display()))?;

    let config_path = match &global.config {
        Some(path) => PathBuf::from(path),
        None => CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.exists())
            .unwrap_or_else(|| root.join(CONFIG_FILE_NAMES[0])),
    };

    if config_path.exists() {
        println!("Using existing {}", config_path.display());
    } else {
        let name = match &args.name {
            Some(name) => name.clone(),
            None => default_project_name(root)?,
        };
        write_config(&config_path, &name, &args.database_path)?;
        println!("Created {}", config_path.display());
    }

    let config = Config::load(&config_path).context("Failed to load configuration file")?;

    for dir in config.schema_paths_absolute(root) {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let migrations = config.migrations_path_absolute(root);
    Ledger::init(&migrations).context("Failed to initialize ledger")?;
    println!("Initialized empty ledger in {}", migrations.display());
    println!("\nNext steps:");
    println!("  1. Declare tables as YAML files under {}", config.schema_paths.join(", "));
    println!("  2. tidemark migrate -m \"initial schema\"");
    println!("  3. tidemark upgrade");

    Ok(())
}

fn default_project_name(root: &Path) -> Result<String> {
    let absolute = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", root.display()))?;
    Ok(absolute
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("tidemark")
        .to_string())
}

fn write_config(path: &Path, name: &str, database_path: &str) -> Result<()> {
    // Escape YAML special characters in interpolated values
    let safe_name = name.replace('\\', "\\\\").replace('"', "\\\"");
    let safe_db_path = database_path.replace('\\', "\\\\").replace('"', "\\\"");
    let content = format!(
        r#"name: "{safe_name}"

schema_paths: ["schema"]
migrations_path: "migrations"

database:
  type: duckdb
  path: "{safe_db_path}"

# Commit after every step instead of once per upgrade/downgrade run
transaction_per_step: false

# targets:
#   test:
#     database:
#       type: memory
"#
    );
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
