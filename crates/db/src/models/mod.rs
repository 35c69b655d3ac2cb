//! Row models.
//!
//! Each submodule contains a `FromRow` struct matching the database row and
//! a `TryFrom` conversion into the `lyc-core` domain type. Conversion fails
//! with `StoreError::Malformed` when a stored value does not parse.

pub mod automation_log;
pub mod license;
pub mod onboarding;

use lyc_core::error::StoreError;

/// Parse a TEXT enum column, naming the column on failure.
pub(crate) fn parse_column<T>(
    column: &str,
    value: &str,
    parse: fn(&str) -> Result<T, String>,
) -> Result<T, StoreError> {
    parse(value).map_err(|e| StoreError::Malformed(format!("{column}: {e}")))
}
