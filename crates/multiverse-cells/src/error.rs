//! Error types for the `multiverse-cells` crate.

use multiverse_types::{Cell, CellHash};

/// Errors raised while building or hashing boards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CellError {
    /// A cell list contained the same coordinate twice.
    #[error("duplicate cell {0} in board")]
    DuplicateCell(Cell),

    /// Two distinct cells produced the same content hash.
    #[error("hash collision on {hash}: {first} and {second}")]
    HashCollision {
        /// The shared hash.
        hash: CellHash,
        /// The cell that claimed the hash first.
        first: Cell,
        /// The cell that collided with it.
        second: Cell,
    },

    /// A pattern row contained a character other than a live or dead marker.
    #[error("invalid pattern character {found:?} at row {row}, column {column}")]
    InvalidPattern {
        /// Zero-based row.
        row: usize,
        /// Zero-based column.
        column: usize,
        /// The offending character.
        found: char,
    },

    /// A pattern was too large to address with `i32` coordinates.
    #[error("pattern exceeds the coordinate range")]
    PatternTooLarge,
}
