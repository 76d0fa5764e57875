//! Macro for defining validated string identifiers.
//!
//! Table names, column names, and step ids are all plain strings on the wire
//! but must never be mixed up with each other or hold text that cannot be
//! safely quoted into DDL. Each identifier type picks a validation rule and
//! gets the same set of trait impls (Display, Deref, AsRef, Borrow, TryFrom,
//! PartialEq, Serialize, Deserialize) from a single invocation.

/// A SQL-safe identifier: ASCII letter or underscore, then letters, digits,
/// or underscores.
pub(crate) fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Define a strongly-typed string identifier checked by `$rule`.
///
/// Generates:
/// - The struct with `Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize`
/// - Custom `Deserialize` (rejects values failing `$rule`)
/// - `new()` (panics on invalid input), `try_new()` (returns Option), `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, `Deref<Target=str>`, `Borrow<str>`
/// - `TryFrom<String>`, `TryFrom<&str>`
/// - `PartialEq<str>`, `PartialEq<&str>`
macro_rules! define_identifier {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident: $rule:path;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::try_from(s).map_err(serde::de::Error::custom)
            }
        }

        impl $Name {
            /// Create a new instance, panicking if the value is not a valid identifier.
            ///
            /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
            pub fn new(value: impl Into<String>) -> Self {
                let s = value.into();
                assert!($rule(&s), "invalid {}: {:?}", stringify!($Name), s);
                Self(s)
            }

            /// Try to create a new instance, returning `None` if the value is invalid.
            pub fn try_new(value: impl Into<String>) -> Option<Self> {
                let s = value.into();
                if $rule(&s) { Some(Self(s)) } else { None }
            }

            /// Return the underlying value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str { &self.0 }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str { &self.0 }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl TryFrom<String> for $Name {
            type Error = String;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                if $rule(&s) {
                    Ok(Self(s))
                } else {
                    Err(format!("invalid {}: {:?}", stringify!($Name), s))
                }
            }
        }

        impl TryFrom<&str> for $Name {
            type Error = String;
            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::try_from(s.to_string())
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool { self.0 == other }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool { self.0 == *other }
        }
    };
}

pub(crate) use define_identifier;

#[cfg(test)]
mod tests {
    use super::is_sql_identifier;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(is_sql_identifier("users"));
        assert!(is_sql_identifier("_private"));
        assert!(is_sql_identifier("order_items2"));
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("2fast"));
        assert!(!is_sql_identifier("drop table"));
        assert!(!is_sql_identifier("a\"b"));
        assert!(!is_sql_identifier("schema.table"));
    }
}
