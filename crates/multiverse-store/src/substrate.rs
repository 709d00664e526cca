//! The substrate contract.
//!
//! The timeline engine never touches storage directly. It reads and writes
//! through a [`Substrate`]: an append-only store of typed facts with atomic
//! multi-operation transactions, uniqueness enforcement for timeline names
//! and record hashes, and point-in-time reads keyed by [`TxId`].
//!
//! Reads take an explicit `as_of` marker. Callers capture one with
//! [`Substrate::basis`] at the start of an operation and pass it to every
//! read in that operation, which gives them a consistent snapshot even while
//! other threads append.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use multiverse_types::{CellHash, CellRecord, CommitRecord, Timeline, TimelineId, TxId};

use crate::StoreError;
use crate::transaction::{Transaction, TxReceipt};

/// Append-only transactional store of timelines, records, and commits.
pub trait Substrate: Send + Sync {
    /// Marker of the most recent applied transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is unavailable.
    fn basis(&self) -> Result<TxId, StoreError>;

    /// Validate and apply a transaction atomically.
    ///
    /// Either every operation is applied under one new [`TxId`] or nothing
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure: [`StoreError::NameTaken`],
    /// [`StoreError::HashCollision`], [`StoreError::StepConflict`],
    /// [`StoreError::UnknownTimeline`], [`StoreError::UnknownRecord`], and
    /// so on.
    fn transact(&self, tx: Transaction) -> Result<TxReceipt, StoreError>;

    /// Look up a timeline by name as of a marker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is unavailable.
    fn timeline_by_name(&self, name: &str, as_of: TxId) -> Result<Option<Timeline>, StoreError>;

    /// Look up a timeline by identifier as of a marker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is unavailable.
    fn timeline_by_id(&self, id: TimelineId, as_of: TxId)
    -> Result<Option<Timeline>, StoreError>;

    /// All timelines visible as of a marker, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is unavailable.
    fn timelines(&self, as_of: TxId) -> Result<Vec<Timeline>, StoreError>;

    /// Number of commits on a timeline as of a marker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTimeline`] if the timeline is not visible.
    fn commit_count(&self, timeline: TimelineId, as_of: TxId) -> Result<u64, StoreError>;

    /// Commits with steps in `steps`, as of a marker, in step order.
    ///
    /// Steps past the visible end of the log are silently excluded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTimeline`] if the timeline is not visible.
    fn commits(
        &self,
        timeline: TimelineId,
        steps: Range<u64>,
        as_of: TxId,
    ) -> Result<Vec<CommitRecord>, StoreError>;

    /// Step of the newest checkpoint at or before `step`, as of a marker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTimeline`] if the timeline is not visible.
    fn latest_checkpoint(
        &self,
        timeline: TimelineId,
        step: u64,
        as_of: TxId,
    ) -> Result<Option<u64>, StoreError>;

    /// Look up a single record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is unavailable.
    fn record(&self, hash: CellHash) -> Result<Option<CellRecord>, StoreError>;

    /// Resolve a batch of hashes to their records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownRecord`] for the first hash with no
    /// record.
    fn records(
        &self,
        hashes: &BTreeSet<CellHash>,
    ) -> Result<BTreeMap<CellHash, CellRecord>, StoreError>;
}
