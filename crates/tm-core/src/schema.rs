//! Declarative schema model: columns, tables, and point-in-time snapshots.

use crate::column_type::ColumnType;
use crate::identifier::{define_identifier, is_sql_identifier};
use crate::serde_helpers::{default_true, is_false};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

define_identifier! {
    /// Strongly-typed table name. Always a plain SQL identifier.
    pub struct TableName: is_sql_identifier;
}

define_identifier! {
    /// Strongly-typed column name. Always a plain SQL identifier.
    pub struct ColumnName: is_sql_identifier;
}

/// Default value of a column.
///
/// Literal variants are rendered as SQL literals; `Expr` is emitted verbatim
/// and covers functions such as `now()` or any literal the other variants
/// cannot hold (floats, dates).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// Raw SQL expression
    Expr { expr: String },
    /// String literal
    Text(String),
}

impl DefaultValue {
    /// Render the value as a SQL expression.
    pub fn sql_literal(&self) -> String {
        match self {
            DefaultValue::Bool(b) => b.to_string(),
            DefaultValue::Integer(n) => n.to_string(),
            DefaultValue::Expr { expr } => expr.clone(),
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Parse a SQL default expression back into a value.
    ///
    /// Anything that is not a boolean, an integer, or a single quoted string
    /// is kept as an expression.
    pub fn from_sql(expr: &str) -> Self {
        let trimmed = expr.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return DefaultValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return DefaultValue::Bool(false);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return DefaultValue::Integer(n);
        }
        if let Some(text) = unquote(trimmed) {
            return DefaultValue::Text(text);
        }
        DefaultValue::Expr {
            expr: trimmed.to_string(),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_literal())
    }
}

/// Strip one level of single quotes, undoing `''` escapes. Returns `None`
/// unless the whole input is exactly one quoted literal.
fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            } else {
                return None;
            }
        }
        out.push(c);
    }
    Some(out)
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table
    pub name: ColumnName,

    /// Logical type
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Whether NULL is allowed
    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Whether values must be unique
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,

    /// Whether the column is indexed
    #[serde(default, skip_serializing_if = "is_false")]
    pub index: bool,

    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,

    /// Whether this column is the table's primary key
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
}

impl Column {
    /// A nullable, unconstrained column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: ColumnName::new(name),
            column_type,
            nullable: true,
            unique: false,
            index: false,
            default: None,
            primary_key: false,
        }
    }

    /// Mark as primary key (implies NOT NULL).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark as indexed.
    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// True when both columns have the same definition apart from the name.
    pub fn same_definition(&self, other: &Column) -> bool {
        self.column_type == other.column_type
            && self.nullable == other.nullable
            && self.unique == other.unique
            && self.index == other.index
            && self.default == other.default
            && self.primary_key == other.primary_key
    }

    /// Human-readable list of the attributes that differ from `other`,
    /// phrased as the values `self` has (e.g. `unique=false, nullable=false`).
    pub fn changes_from(&self, other: &Column) -> Vec<String> {
        let mut changes = Vec::new();
        if self.column_type != other.column_type {
            changes.push(format!("type={}", self.column_type));
        }
        if self.unique != other.unique {
            changes.push(format!("unique={}", self.unique));
        }
        if self.nullable != other.nullable {
            changes.push(format!("nullable={}", self.nullable));
        }
        if self.index != other.index {
            changes.push(format!("index={}", self.index));
        }
        if self.default != other.default {
            match &self.default {
                Some(v) => changes.push(format!("default={}", v)),
                None => changes.push("default=none".to_string()),
            }
        }
        if self.primary_key != other.primary_key {
            changes.push(format!("primary_key={}", self.primary_key));
        }
        changes
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.column_type)?;
        if self.primary_key {
            f.write_str(" pk")?;
        } else if !self.nullable {
            f.write_str(" not-null")?;
        }
        if self.unique {
            f.write_str(" unique")?;
        }
        if self.index {
            f.write_str(" indexed")?;
        }
        if let Some(default) = &self.default {
            write!(f, " default={}", default)?;
        }
        Ok(())
    }
}

/// A table definition.
///
/// Column order is kept for rendering DDL, but equality treats the columns
/// as a set: two tables are equal when they have the same name and the same
/// column definitions in any order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Table name, unique within the schema
    pub name: TableName,

    /// Column definitions
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: TableName::new(name),
            columns,
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether the table has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The primary-key column, if one is marked.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Compare column sets, ignoring the table name and column order.
    pub fn same_columns(&self, other: &Table) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .all(|c| other.column(&c.name).is_some_and(|o| o == c))
    }

    pub(crate) fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.same_columns(other)
    }
}

impl Eq for Table {}

/// An immutable, timestamped set of tables.
///
/// Snapshots compare structurally: the timestamp is informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    taken_at: DateTime<Utc>,
    tables: BTreeMap<TableName, Table>,
}

impl SchemaSnapshot {
    /// Build a snapshot from tables. A later table with the same name
    /// replaces an earlier one; callers validate uniqueness beforehand.
    pub fn new(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            taken_at: Utc::now(),
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// The schema with no tables.
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// When the snapshot was produced.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Whether a table with this name exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Tables ordered by name.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Table names in order.
    pub fn table_names(&self) -> impl Iterator<Item = &TableName> {
        self.tables.keys()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub(crate) fn tables_mut(&mut self) -> &mut BTreeMap<TableName, Table> {
        &mut self.tables
    }

    pub(crate) fn touch(&mut self) {
        self.taken_at = Utc::now();
    }
}

impl PartialEq for SchemaSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.tables == other.tables
    }
}

impl Eq for SchemaSnapshot {}

impl Default for SchemaSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
