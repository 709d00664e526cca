//! Shared type definitions for the Multiverse timeline store.
//!
//! This crate is the single source of truth for the values that flow
//! between the cell algebra, the substrate, the timeline engine, and the
//! archive.
//!
//! # Modules
//!
//! - [`ids`] -- UUID wrappers for timelines and commits, and the [`TxId`]
//!   transaction marker
//! - [`cell`] -- [`Cell`], [`Board`], and content-addressed [`CellRecord`]s
//! - [`structs`] -- Timelines, commits, and exports
//! - [`enums`] -- [`StepSelector`] and step parsing errors

pub mod cell;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use cell::{Board, Cell, CellHash, CellRecord};
pub use enums::{StepError, StepSelector};
pub use ids::{CommitId, TimelineId, TxId};
pub use structs::{BranchOrigin, CommitRecord, Timeline, TimelineExport};
