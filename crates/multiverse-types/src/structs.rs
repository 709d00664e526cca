//! Timeline, commit, and export structures.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cell::{CellHash, CellRecord};
use crate::ids::{CommitId, TimelineId, TxId};

/// Where a branched timeline was forked from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOrigin {
    /// Source timeline identifier.
    pub source: TimelineId,
    /// Source timeline name at the time of the branch.
    pub source_name: String,
    /// Step of the source timeline whose board seeded the branch.
    pub step: u64,
}

/// A named, append-only sequence of commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    /// Stable identifier.
    pub id: TimelineId,
    /// Globally unique name.
    pub name: String,
    /// Wall-clock time the timeline was created.
    pub created_at: DateTime<Utc>,
    /// Fork point, when the timeline was created by a branch operation.
    /// Merged branches record their left-hand source.
    pub origin: Option<BranchOrigin>,
}

/// One recorded board transition.
///
/// Only the delta against the previous step is stored. `checkpoint`, when
/// present, holds the hashes of every live cell at this step so replay can
/// start here instead of at step 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Stable identifier.
    pub id: CommitId,
    /// Owning timeline.
    pub timeline: TimelineId,
    /// Step index, contiguous from 0 within the timeline.
    pub step: u64,
    /// Transaction that made the commit visible.
    pub tx: TxId,
    /// Wall-clock time of the transaction.
    pub committed_at: DateTime<Utc>,
    /// Records that became alive at this step.
    pub asserted: BTreeSet<CellHash>,
    /// Records that stopped being alive at this step.
    pub retracted: BTreeSet<CellHash>,
    /// Full board at this step, if a checkpoint was written.
    pub checkpoint: Option<BTreeSet<CellHash>>,
}

/// A self-contained copy of one timeline and everything its commits
/// reference, used for archiving and restoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineExport {
    /// The timeline header.
    pub timeline: Timeline,
    /// Every record referenced by any commit, ordered by hash.
    pub records: Vec<CellRecord>,
    /// Commits in step order.
    pub commits: Vec<CommitRecord>,
}
