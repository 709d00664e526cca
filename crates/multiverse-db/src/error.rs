//! Error types for the archive.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors and adds the integrity failures the archive detects
//! itself.

use multiverse_types::{Cell, CellHash};

/// Errors that can occur in the archive.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record hash is archived with different coordinates.
    #[error("hash collision on {hash}: archived {archived}, incoming {incoming}")]
    HashCollision {
        /// The shared hash.
        hash: CellHash,
        /// The cell already archived under the hash.
        archived: Cell,
        /// The cell being archived.
        incoming: Cell,
    },

    /// A timeline with the same name but a different identifier is
    /// already archived.
    #[error("timeline name {0} is archived under a different id")]
    NameTaken(String),

    /// Archived rows could not be turned back into a timeline.
    #[error("corrupt archive: {0}")]
    Corrupt(String),
}
