//! Multi-operation transactions against the substrate.
//!
//! A [`Transaction`] is an ordered list of [`TxOp`]s that the substrate
//! validates as a whole and then applies as a whole. Later operations may
//! refer to timelines and records introduced by earlier operations in the
//! same transaction.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use multiverse_types::{CellHash, CellRecord, CommitId, Timeline, TimelineId, TxId};

/// A commit waiting to be appended.
///
/// The substrate assigns the transaction marker. `committed_at` is normally
/// left unset so the substrate stamps the transaction time; imports set it to
/// keep the original timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDraft {
    /// Identifier for the new commit.
    pub id: CommitId,
    /// Timeline to append to.
    pub timeline: TimelineId,
    /// Step the caller expects to write; must equal the current commit count.
    pub step: u64,
    /// Records becoming alive.
    pub asserted: BTreeSet<CellHash>,
    /// Records no longer alive.
    pub retracted: BTreeSet<CellHash>,
    /// Full board, when this commit is a checkpoint.
    pub checkpoint: Option<BTreeSet<CellHash>>,
    /// Timestamp override.
    pub committed_at: Option<DateTime<Utc>>,
}

impl CommitDraft {
    /// Start a draft for `timeline` at `step` with an empty delta.
    pub fn new(timeline: TimelineId, step: u64) -> Self {
        Self {
            id: CommitId::new(),
            timeline,
            step,
            asserted: BTreeSet::new(),
            retracted: BTreeSet::new(),
            checkpoint: None,
            committed_at: None,
        }
    }

    /// Set the asserted records.
    #[must_use]
    pub fn asserting(mut self, hashes: BTreeSet<CellHash>) -> Self {
        self.asserted = hashes;
        self
    }

    /// Set the retracted records.
    #[must_use]
    pub fn retracting(mut self, hashes: BTreeSet<CellHash>) -> Self {
        self.retracted = hashes;
        self
    }

    /// Attach a full-board checkpoint.
    #[must_use]
    pub fn with_checkpoint(mut self, hashes: BTreeSet<CellHash>) -> Self {
        self.checkpoint = Some(hashes);
        self
    }
}

/// One operation inside a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOp {
    /// Register a new timeline. Its name must be unused.
    CreateTimeline(Timeline),
    /// Register a record, or confirm an identical one already exists.
    InternRecord(CellRecord),
    /// Append one commit to a timeline.
    AppendCommit(CommitDraft),
}

/// An ordered batch of operations applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    ops: Vec<TxOp>,
}

impl Transaction {
    /// Create an empty transaction.
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Add a timeline creation.
    #[must_use]
    pub fn create_timeline(mut self, timeline: Timeline) -> Self {
        self.ops.push(TxOp::CreateTimeline(timeline));
        self
    }

    /// Add a record interning.
    #[must_use]
    pub fn intern(mut self, record: CellRecord) -> Self {
        self.ops.push(TxOp::InternRecord(record));
        self
    }

    /// Add every record from an iterator.
    #[must_use]
    pub fn intern_all<I: IntoIterator<Item = CellRecord>>(mut self, records: I) -> Self {
        self.ops
            .extend(records.into_iter().map(TxOp::InternRecord));
        self
    }

    /// Add a commit append.
    #[must_use]
    pub fn append_commit(mut self, draft: CommitDraft) -> Self {
        self.ops.push(TxOp::AppendCommit(draft));
        self
    }

    /// Return the operations in order.
    pub fn ops(&self) -> &[TxOp] {
        &self.ops
    }

    /// Consume the transaction and return its operations.
    pub fn into_ops(self) -> Vec<TxOp> {
        self.ops
    }

    /// Return the number of operations.
    pub const fn len(&self) -> usize {
        self.ops.len()
    }

    /// Return whether the transaction has no operations.
    pub const fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// What a successful transaction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Marker assigned to the transaction.
    pub tx: TxId,
    /// Wall-clock time the transaction was applied.
    pub committed_at: DateTime<Utc>,
    /// Number of timelines created.
    pub timelines_created: usize,
    /// Number of records newly interned (existing identical records excluded).
    pub records_interned: usize,
    /// `(timeline, step)` of each appended commit, in order.
    pub commits: Vec<(TimelineId, u64)>,
}
