//! Logical column types.
//!
//! Types are written in declarations and step files by their canonical
//! lowercase name (`string(80)`, `numeric(10,2)`). Parsing also accepts the
//! common SQL spellings (`VARCHAR(80)`, `DECIMAL(10,2)`, `BIGINT`) so that
//! types read back from a live database map onto the same values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Precision used when `numeric` is declared without arguments.
pub const DEFAULT_NUMERIC_PRECISION: u8 = 18;

/// Scale used when `numeric` is declared without arguments.
pub const DEFAULT_NUMERIC_SCALE: u8 = 3;

/// Largest precision accepted for `numeric(p,s)`.
pub const MAX_NUMERIC_PRECISION: u8 = 38;

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ColumnType {
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInteger,
    /// 16-bit integer
    SmallInteger,
    /// Single-precision float
    Float,
    /// Double-precision float
    Double,
    /// Fixed-point decimal
    Numeric { precision: u8, scale: u8 },
    /// Boolean
    Boolean,
    /// Variable-length string with an optional maximum length
    String { max_length: Option<u32> },
    /// Unbounded text
    Text,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Timestamp without time zone
    DateTime,
    /// Binary blob
    Binary,
    /// UUID
    Uuid,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => f.write_str("integer"),
            ColumnType::BigInteger => f.write_str("biginteger"),
            ColumnType::SmallInteger => f.write_str("smallinteger"),
            ColumnType::Float => f.write_str("float"),
            ColumnType::Double => f.write_str("double"),
            ColumnType::Numeric { precision, scale } => {
                write!(f, "numeric({},{})", precision, scale)
            }
            ColumnType::Boolean => f.write_str("boolean"),
            ColumnType::String { max_length: None } => f.write_str("string"),
            ColumnType::String {
                max_length: Some(n),
            } => write!(f, "string({})", n),
            ColumnType::Text => f.write_str("text"),
            ColumnType::Date => f.write_str("date"),
            ColumnType::Time => f.write_str("time"),
            ColumnType::DateTime => f.write_str("datetime"),
            ColumnType::Binary => f.write_str("binary"),
            ColumnType::Uuid => f.write_str("uuid"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (base, args) = split_arguments(&lowered).ok_or_else(|| unknown(s))?;

        let ty = match (base, args.as_slice()) {
            ("integer" | "int" | "int4", []) => ColumnType::Integer,
            ("biginteger" | "bigint" | "int8", []) => ColumnType::BigInteger,
            ("smallinteger" | "smallint" | "int2", []) => ColumnType::SmallInteger,
            ("float" | "real" | "float4", []) => ColumnType::Float,
            ("double" | "double precision" | "float8", []) => ColumnType::Double,
            ("numeric" | "decimal", []) => ColumnType::Numeric {
                precision: DEFAULT_NUMERIC_PRECISION,
                scale: DEFAULT_NUMERIC_SCALE,
            },
            ("numeric" | "decimal", [p]) => numeric(s, p, "0")?,
            ("numeric" | "decimal", [p, sc]) => numeric(s, p, sc)?,
            ("boolean" | "bool", []) => ColumnType::Boolean,
            ("string" | "varchar" | "character varying", []) => {
                ColumnType::String { max_length: None }
            }
            ("string" | "varchar" | "character varying", [n]) => {
                let n: u32 = n.parse().map_err(|_| unknown(s))?;
                if n == 0 {
                    return Err(unknown(s));
                }
                ColumnType::String {
                    max_length: Some(n),
                }
            }
            ("text", []) => ColumnType::Text,
            ("date", []) => ColumnType::Date,
            ("time", []) => ColumnType::Time,
            ("datetime" | "timestamp", []) => ColumnType::DateTime,
            ("binary" | "blob" | "bytea", []) => ColumnType::Binary,
            ("uuid", []) => ColumnType::Uuid,
            _ => return Err(unknown(s)),
        };
        Ok(ty)
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.to_string()
    }
}

impl TryFrom<String> for ColumnType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

fn unknown(s: &str) -> String {
    format!("unknown column type '{}'", s.trim())
}

/// Split `name(a, b)` into `("name", ["a", "b"])`. Returns `None` when the
/// parentheses are unbalanced or trail other text.
fn split_arguments(s: &str) -> Option<(&str, Vec<&str>)> {
    let Some(open) = s.find('(') else {
        return Some((s, Vec::new()));
    };
    let close = s.rfind(')')?;
    if close != s.len() - 1 || close < open {
        return None;
    }
    let base = s[..open].trim_end();
    let inner = &s[open + 1..close];
    if inner.contains('(') || inner.contains(')') {
        return None;
    }
    let args = inner.split(',').map(str::trim).collect();
    Some((base, args))
}

fn numeric(original: &str, precision: &str, scale: &str) -> Result<ColumnType, String> {
    let precision: u8 = precision.parse().map_err(|_| unknown(original))?;
    let scale: u8 = scale.parse().map_err(|_| unknown(original))?;
    if precision == 0 || precision > MAX_NUMERIC_PRECISION || scale > precision {
        return Err(unknown(original));
    }
    Ok(ColumnType::Numeric { precision, scale })
}

#[cfg(test)]
#[path = "column_type_test.rs"]
mod tests;
