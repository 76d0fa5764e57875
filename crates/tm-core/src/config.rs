//! Configuration types and parsing for tidemark.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file names searched for in a project directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["tidemark.yml", "tidemark.yaml"];

/// In-memory DuckDB path.
pub const MEMORY_DB_PATH: &str = ":memory:";

const DEFAULT_SCHEMA_DIR: &str = "schema";
const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Main project configuration from tidemark.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directories containing table declaration files
    #[serde(default = "default_schema_paths")]
    pub schema_paths: Vec<String>,

    /// Directory holding recorded migration steps
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,

    /// Live database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Commit after every step instead of once per upgrade/downgrade run
    #[serde(default)]
    pub transaction_per_step: bool,

    /// Named target configurations (e.g. dev, test, prod)
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Transaction mode override
    #[serde(default)]
    pub transaction_per_step: Option<bool>,
}

/// Database backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// In-process structural executor; nothing is persisted
    Memory,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Memory => write!(f, "memory"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Backend type
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database file path (or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    /// The database path, resolved against `root` when it is a relative file path.
    pub fn path_absolute(&self, root: &Path) -> String {
        if self.path == MEMORY_DB_PATH || Path::new(&self.path).is_absolute() {
            self.path.clone()
        } else {
            root.join(&self.path).display().to_string()
        }
    }
}

fn default_schema_paths() -> Vec<String> {
    vec![DEFAULT_SCHEMA_DIR.to_string()]
}

fn default_migrations_path() -> String {
    DEFAULT_MIGRATIONS_DIR.to_string()
}

fn default_db_path() -> String {
    MEMORY_DB_PATH.to_string()
}

impl Config {
    /// A fresh configuration with default paths.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_paths: default_schema_paths(),
            migrations_path: default_migrations_path(),
            database: DatabaseConfig::default(),
            transaction_per_step: false,
            targets: BTreeMap::new(),
        }
    }

    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for tidemark.yml or tidemark.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }
        Err(CoreError::ConfigNotFound {
            path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }
        if self.schema_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one schema_paths entry must be specified".to_string(),
            });
        }
        if self.migrations_path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_path cannot be empty".to_string(),
            });
        }
        let databases = std::iter::once(("database".to_string(), &self.database)).chain(
            self.targets.iter().filter_map(|(name, t)| {
                t.database
                    .as_ref()
                    .map(|db| (format!("targets.{}.database", name), db))
            }),
        );
        for (key, db) in databases {
            if db.path.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{}.path cannot be empty", key),
                });
            }
        }
        Ok(())
    }

    /// Get absolute schema paths relative to a project root
    pub fn schema_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.schema_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Get the absolute migrations directory relative to a project root
    pub fn migrations_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_path)
    }

    /// Get the list of available target names
    pub fn available_targets(&self) -> Vec<&str> {
        self.targets.keys().map(|s| s.as_str()).collect()
    }

    fn target(&self, name: &str) -> CoreResult<&TargetConfig> {
        self.targets
            .get(name)
            .ok_or_else(|| CoreError::UnknownTarget {
                name: name.to_string(),
                available: self.available_targets().join(", "),
            })
    }

    /// Get database configuration, optionally applying target overrides
    pub fn database_for(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => Ok(self
                .target(name)?
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone())),
            None => Ok(self.database.clone()),
        }
    }

    /// Get the transaction mode, optionally applying target overrides
    pub fn transaction_per_step_for(&self, target: Option<&str>) -> CoreResult<bool> {
        match target {
            Some(name) => Ok(self
                .target(name)?
                .transaction_per_step
                .unwrap_or(self.transaction_per_step)),
            None => Ok(self.transaction_per_step),
        }
    }

    /// Resolve target from CLI flag or TIDEMARK_TARGET env var
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var("TIDEMARK_TARGET").ok())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
