//! Schema model registry
//!
//! Holds the table declarations supplied by the application layer and turns
//! them into a validated [`SchemaSnapshot`] on request. Declarations are kept
//! as raw strings so that every problem is reported as a [`SchemaError`]
//! when the snapshot is taken rather than as a parse failure.

use crate::column_type::ColumnType;
use crate::error::{CoreError, CoreResult, SchemaError, SchemaResult};
use crate::schema::{Column, ColumnName, DefaultValue, SchemaSnapshot, Table, TableName};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Declared table, as written in a declaration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDecl {
    /// Table name
    pub name: String,

    /// Column declarations, in order
    #[serde(default)]
    pub columns: Vec<ColumnDecl>,
}

/// Declared column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDecl {
    /// Column name
    pub name: String,

    /// Type name, e.g. `integer` or `string(80)`
    #[serde(rename = "type")]
    pub data_type: String,

    /// Explicit nullability; unset means nullable (primary keys: not null)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub index: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,

    #[serde(default)]
    pub primary_key: bool,
}

impl TableDecl {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDecl>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

impl ColumnDecl {
    /// A column with only a name and a type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: None,
            unique: false,
            index: false,
            default: None,
            primary_key: false,
        }
    }
}

/// Registry of declared tables.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    tables: Vec<TableDecl>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. Nothing is validated until [`snapshot`](Self::snapshot).
    pub fn register(&mut self, table: TableDecl) -> &mut Self {
        self.tables.push(table);
        self
    }

    /// Number of registered declarations.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Load every `.yml`/`.yaml` declaration under `dirs`, recursively.
    ///
    /// Files are read in sorted path order. Missing directories are skipped
    /// with a warning. Returns the number of declarations loaded.
    pub fn load_dirs(&mut self, dirs: &[PathBuf]) -> CoreResult<usize> {
        let mut files = Vec::new();
        for dir in dirs {
            if !dir.is_dir() {
                log::warn!("Schema directory {} does not exist, skipping", dir.display());
                continue;
            }
            discover_declarations(dir, &mut files)?;
        }
        files.sort();

        for path in &files {
            let table = load_declaration(path)?;
            log::debug!("Loaded declaration of '{}' from {}", table.name, path.display());
            self.tables.push(table);
        }
        Ok(files.len())
    }

    /// Validate the declarations and build a snapshot.
    pub fn snapshot(&self) -> SchemaResult<SchemaSnapshot> {
        let mut seen = HashSet::new();
        let mut tables = Vec::with_capacity(self.tables.len());
        for decl in &self.tables {
            let name = TableName::try_new(decl.name.as_str()).ok_or_else(|| {
                SchemaError::InvalidName {
                    kind: "table",
                    name: decl.name.clone(),
                }
            })?;
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateTable {
                    table: decl.name.clone(),
                });
            }
            tables.push(validate_table(name, decl)?);
        }
        Ok(SchemaSnapshot::new(tables))
    }
}

fn validate_table(name: TableName, decl: &TableDecl) -> SchemaResult<Table> {
    if decl.columns.is_empty() {
        return Err(SchemaError::EmptyTable {
            table: decl.name.clone(),
        });
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(decl.columns.len());
    for col in &decl.columns {
        let column_name =
            ColumnName::try_new(col.name.as_str()).ok_or_else(|| SchemaError::InvalidName {
                kind: "column",
                name: col.name.clone(),
            })?;
        if !seen.insert(column_name.clone()) {
            return Err(SchemaError::DuplicateColumn {
                table: decl.name.clone(),
                column: col.name.clone(),
            });
        }
        let column_type: ColumnType =
            col.data_type
                .parse()
                .map_err(|_| SchemaError::UnknownType {
                    table: decl.name.clone(),
                    column: col.name.clone(),
                    type_name: col.data_type.clone(),
                })?;
        if col.primary_key && col.nullable == Some(true) {
            return Err(SchemaError::NullablePrimaryKey {
                table: decl.name.clone(),
                column: col.name.clone(),
            });
        }
        columns.push(Column {
            name: column_name,
            column_type,
            nullable: !col.primary_key && col.nullable.unwrap_or(true),
            unique: col.unique,
            index: col.index,
            default: col.default.clone(),
            primary_key: col.primary_key,
        });
    }

    let keys: Vec<&str> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    match keys.len() {
        0 => Err(SchemaError::MissingPrimaryKey {
            table: decl.name.clone(),
        }),
        1 => Ok(Table { name, columns }),
        _ => Err(SchemaError::MultiplePrimaryKeys {
            table: decl.name.clone(),
            columns: keys.join(", "),
        }),
    }
}

fn discover_declarations(dir: &Path, files: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            discover_declarations(&path, files)?;
            continue;
        }
        if path.extension().is_some_and(|e| e == "yml" || e == "yaml") {
            files.push(path);
        }
    }
    Ok(())
}

fn load_declaration(path: &Path) -> CoreResult<TableDecl> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_yaml::from_str(&content).map_err(|e| CoreError::DeclarationParse {
        path: path.display().to_string(),
        details: e.to_string(),
    })
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
