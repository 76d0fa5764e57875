//! Migration targets as accepted on the command line.

use crate::error::LedgerError;
use std::fmt;
use std::str::FromStr;

/// A position in the ledger to migrate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The newest step
    Head,
    /// Before the first step
    Base,
    /// A full step id or a unique prefix of one
    Id(String),
    /// An offset from the current position (`+2`, `-1`)
    Relative(i64),
}

impl FromStr for Target {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| LedgerError::InvalidTarget {
            target: s.to_string(),
            reason: reason.to_string(),
        };

        match s {
            "head" => return Ok(Target::Head),
            "base" => return Ok(Target::Base),
            "" => return Err(invalid("empty target")),
            _ => {}
        }

        if let Some(digits) = s.strip_prefix('+').or_else(|| s.strip_prefix('-')) {
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("relative targets look like +N or -N"));
            }
            let offset: i64 = s.parse().map_err(|_| invalid("offset out of range"))?;
            return Ok(Target::Relative(offset));
        }

        if s.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Target::Id(s.to_string()))
        } else {
            Err(invalid("expected head, base, a step id, or +N/-N"))
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Head => write!(f, "head"),
            Target::Base => write!(f, "base"),
            Target::Id(id) => write!(f, "{}", id),
            Target::Relative(n) => write!(f, "{:+}", n),
        }
    }
}
