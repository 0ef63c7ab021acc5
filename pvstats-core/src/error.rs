//! Error types produced by table operations.

use thiserror::Error;

use crate::Value;

/// Errors from [`Table`](crate::Table) and [`GeoTable`](crate::GeoTable)
/// operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum TableError {
    /// A referenced column is absent.
    #[error("column `{name}` does not exist")]
    MissingColumn {
        /// Name that failed to resolve.
        name: String,
    },
    /// A column with the same name is already present.
    #[error("column `{name}` already exists")]
    DuplicateColumn {
        /// Conflicting column name.
        name: String,
    },
    /// A column does not have as many cells as the table has rows.
    #[error("column `{name}` has {found} values, expected {expected}")]
    LengthMismatch {
        /// Offending column, or `geometry` for the geometry vector.
        name: String,
        /// Expected number of rows.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
    /// A cell could not be converted to the requested numeric type.
    #[error("value {value:?} in column `{column}` (row {row}) is not numeric")]
    NotNumeric {
        /// Column being converted.
        column: String,
        /// Zero-based row index.
        row: usize,
        /// Offending cell.
        value: Value,
    },
    /// No row matched a lookup value.
    #[error("no row has `{column}` equal to `{value}`")]
    MissingRow {
        /// Column used for the lookup.
        column: String,
        /// Looked-up value.
        value: String,
    },
    /// Join keys were supplied with different arities.
    #[error("join keys differ in length: {left} left vs {right} right")]
    KeyArity {
        /// Number of left keys.
        left: usize,
        /// Number of right keys.
        right: usize,
    },
}
