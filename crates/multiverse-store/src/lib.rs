//! Append-only transactional substrate for Multiverse timelines.
//!
//! The substrate holds three kinds of fact: timelines, content-addressed
//! cell records, and commits. Facts are only ever added. Every write goes
//! through a [`Transaction`] that is validated in full and then applied
//! under a single [`TxId`](multiverse_types::TxId), so readers either see
//! all of it or none of it.
//!
//! # Modules
//!
//! - [`substrate`] -- The [`Substrate`] trait the timeline engine depends on
//! - [`transaction`] -- [`Transaction`], [`TxOp`], [`CommitDraft`], and
//!   [`TxReceipt`]
//! - [`memory`] -- [`MemoryStore`], the in-process implementation
//!
//! # Guarantees
//!
//! - Timeline names are unique across the store.
//! - A record hash maps to exactly one cell; a second cell claiming the
//!   same hash is rejected as a collision.
//! - Commit steps on a timeline are contiguous from 0. An append must name
//!   the next step, which serializes concurrent writers on one timeline.
//! - Reads "as of" a marker see exactly the facts of transactions up to
//!   that marker.

use multiverse_types::{Cell, CellHash, TimelineId};

pub mod memory;
pub mod substrate;
pub mod transaction;

// Re-export primary types at crate root.
pub use memory::{MemoryStore, StoreStats};
pub use substrate::Substrate;
pub use transaction::{CommitDraft, Transaction, TxOp, TxReceipt};

/// Errors raised by a [`Substrate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A transaction contained no operations.
    #[error("transaction has no operations")]
    EmptyTransaction,

    /// A timeline name was empty or blank.
    #[error("invalid timeline name {0:?}")]
    InvalidName(String),

    /// A timeline with this name already exists.
    #[error("timeline name already taken: {0}")]
    NameTaken(String),

    /// A timeline with this identifier already exists.
    #[error("timeline id already exists: {0}")]
    DuplicateTimelineId(TimelineId),

    /// No timeline with this identifier is visible.
    #[error("unknown timeline: {0}")]
    UnknownTimeline(TimelineId),

    /// A commit referenced a hash with no record.
    #[error("unknown cell record: {0}")]
    UnknownRecord(CellHash),

    /// A record hash is already bound to a different cell.
    #[error("hash collision on {hash}: stored {existing}, incoming {incoming}")]
    HashCollision {
        /// The shared hash.
        hash: CellHash,
        /// The cell already stored under the hash.
        existing: Cell,
        /// The cell that tried to claim it.
        incoming: Cell,
    },

    /// An append did not name the next step of its timeline.
    #[error("step conflict on timeline {timeline}: expected {expected}, found {found}")]
    StepConflict {
        /// The timeline being appended to.
        timeline: TimelineId,
        /// The step the store expected next.
        expected: u64,
        /// The step the append named.
        found: u64,
    },

    /// A commit asserted and retracted the same record.
    #[error("commit {step} on timeline {timeline} asserts and retracts the same record")]
    OverlappingDelta {
        /// The timeline being appended to.
        timeline: TimelineId,
        /// The step of the offending commit.
        step: u64,
    },

    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}
