//! Runtime context for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tm_core::{Config, DatabaseConfig, SchemaRegistry, SchemaSnapshot};
use tm_db::Database;
use tm_ledger::Ledger;

use crate::cli::GlobalArgs;

/// Loaded configuration plus the overrides given on the command line
pub(crate) struct CommandContext {
    /// Project root; relative config paths resolve against it
    pub root: PathBuf,

    pub config: Config,

    /// Named target, from `--target` or `TIDEMARK_TARGET`
    pub target: Option<String>,

    database_override: Option<String>,
}

impl CommandContext {
    /// Load the project configuration named by the global arguments
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);

        let config = if let Some(config_path) = &global.config {
            Config::load(Path::new(config_path)).context("Failed to load configuration file")?
        } else {
            Config::load_from_dir(&root).context("Failed to load project configuration")?
        };

        let target = Config::resolve_target(global.target.as_deref());
        if let Some(name) = &target {
            log::debug!("Using target '{}'", name);
        }

        Ok(Self {
            root,
            config,
            target,
            database_override: global.database.clone(),
        })
    }

    pub(crate) fn migrations_dir(&self) -> PathBuf {
        self.config.migrations_path_absolute(&self.root)
    }

    pub(crate) fn open_ledger(&self) -> Result<Ledger> {
        let dir = self.migrations_dir();
        Ledger::open(&dir).with_context(|| format!("Failed to open ledger at {}", dir.display()))
    }

    /// Load and validate every table declaration under `schema_paths`
    pub(crate) fn declared_schema(&self) -> Result<SchemaSnapshot> {
        let mut registry = SchemaRegistry::new();
        let count = registry
            .load_dirs(&self.config.schema_paths_absolute(&self.root))
            .context("Failed to load table declarations")?;
        log::debug!("Loaded {} table declaration(s)", count);
        registry.snapshot().context("Declared schema is invalid")
    }

    /// Database settings for the selected target, with `--database` applied
    pub(crate) fn database_config(&self) -> Result<DatabaseConfig> {
        let mut db = self
            .config
            .database_for(self.target.as_deref())
            .context("Failed to get database configuration")?;
        if let Some(path) = &self.database_override {
            db.path = path.clone();
        }
        Ok(db)
    }

    pub(crate) fn open_database(&self) -> Result<Box<dyn Database>> {
        let db_config = self.database_config()?;
        tm_db::open(&db_config, &self.root).context("Failed to connect to database")
    }

    pub(crate) fn transaction_per_step(&self) -> Result<bool> {
        Ok(self
            .config
            .transaction_per_step_for(self.target.as_deref())?)
    }
}
