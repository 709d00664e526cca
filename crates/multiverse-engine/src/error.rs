//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup, the configured run, and archiving.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: multiverse_core::ConfigError,
    },

    /// A seed pattern or branch cell list was malformed.
    #[error("board error: {source}")]
    Board {
        /// The underlying cell error.
        #[from]
        source: multiverse_cells::CellError,
    },

    /// The configured oracle could not be built.
    #[error("oracle error: {source}")]
    Oracle {
        /// The underlying oracle error.
        #[from]
        source: multiverse_core::OracleError,
    },

    /// A timeline operation failed.
    #[error("multiverse error: {source}")]
    Multiverse {
        /// The underlying timeline error.
        #[from]
        source: multiverse_core::MultiverseError,
    },

    /// Archiving to `PostgreSQL` failed.
    #[error("archive error: {source}")]
    Archive {
        /// The underlying database error.
        #[from]
        source: multiverse_db::DbError,
    },
}
