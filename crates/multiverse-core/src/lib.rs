//! Named, branchable timelines of cellular-automaton boards.
//!
//! A [`Multiverse`] commits successive boards into timelines, stores each
//! commit as the minimal delta against the previous board, rebuilds any
//! historical board by replay, and forks independent timelines from any
//! point in history.
//!
//! # Modules
//!
//! - [`timeline`] -- The [`Multiverse`] handle, timeline creation, and
//!   latest-board reads.
//! - [`commit`] -- The commit engine: diff, hash, and append atomically.
//! - [`history`] -- Point-in-time reads and restartable [`History`]
//!   sequences.
//! - [`branch`] -- Forking, modified forks, merged forks, and lineage.
//! - [`export`] -- Whole-timeline export and validated import.
//! - [`oracle`] -- [`BoardOracle`] and the built-in oracles.
//! - [`runner`] -- The bounded [`evolve`] loop.
//! - [`config`] -- Configuration loading from `multiverse-config.yaml`.
//! - [`error`] -- [`MultiverseError`] and its [`ErrorKind`] classification.
//!
//! # Usage
//!
//! ```
//! use multiverse_core::Multiverse;
//! use multiverse_types::{Board, Cell, StepSelector};
//!
//! let mv = Multiverse::new();
//! let first: Board = [Cell::new(1, 1), Cell::new(2, 2)].into_iter().collect();
//! let second: Board = [Cell::new(2, 2), Cell::new(3, 3)].into_iter().collect();
//!
//! assert_eq!(mv.commit("T", &first).ok(), Some(0));
//! assert_eq!(mv.commit("T", &second).ok(), Some(1));
//! assert!(mv.branch("T", StepSelector::At(0), "T2").is_ok());
//!
//! assert_eq!(mv.board_at("T2", 0).ok().flatten(), Some(first));
//! assert_eq!(mv.board_at("T", 5).ok().flatten(), None);
//! ```

pub mod branch;
pub mod commit;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod oracle;
pub mod runner;
pub mod timeline;

// Re-export primary types at crate root.
pub use commit::CommitReport;
pub use config::{ConfigError, MultiverseConfig};
pub use error::{ErrorKind, MultiverseError};
pub use history::{History, HistoryIter};
pub use oracle::{
    BoardOracle, LifeOracle, MutationOracle, OracleError, ScriptedOracle, build_oracle,
};
pub use runner::{EvolveSummary, evolve};
pub use timeline::Multiverse;
