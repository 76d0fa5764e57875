//! Serde helpers shared by the schema and registry types.

/// Serde default for flags that are on unless declared otherwise.
pub fn default_true() -> bool {
    true
}

/// `skip_serializing_if` predicate that keeps step files free of `false` flags.
pub fn is_false(value: &bool) -> bool {
    !*value
}
