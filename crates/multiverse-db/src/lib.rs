//! `PostgreSQL` archive for Multiverse timelines.
//!
//! The in-memory substrate is authoritative while a process runs. This
//! crate persists exported timelines so they outlive it, and loads them
//! back as [`TimelineExport`](multiverse_types::TimelineExport) values
//! ready for re-import.
//!
//! # Architecture
//!
//! ```text
//! Multiverse (memory)
//!     |
//!     +-- export_timeline --> TimelineExport
//!                                 |
//!                                 +-- ArchiveStore::save_timeline --> PostgreSQL
//!                                 |       |-- timelines
//!                                 |       |-- cell_records  (shared, deduplicated)
//!                                 |       |-- commits
//!                                 |       +-- commit_cells
//!                                 |
//!                                 +-- ArchiveStore::load_timeline <-- PostgreSQL
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`archive_store`] -- Timeline save, load, and listing
//! - [`error`] -- Shared error types

pub mod archive_store;
pub mod error;
pub mod postgres;

// Re-export primary types for convenience.
pub use archive_store::{ArchiveStore, CellRecordRow, CommitCellRow, CommitRow, TimelineRow};
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
