//! In-memory reference implementation of the [`Substrate`] contract.
//!
//! # Layout
//!
//! One arena owns every [`CellRecord`], keyed by hash. Timelines live in a
//! map keyed by [`TimelineId`], each holding its commit log as an
//! append-only `Vec`. A name index maps names to identifiers.
//!
//! # Point-in-time reads
//!
//! Every timeline remembers the transaction that created it and every
//! commit carries its transaction marker. Because markers only grow and
//! logs are only appended to, the commits visible "as of" a marker are
//! always a prefix of the log, found by binary search.
//!
//! # Concurrency
//!
//! State sits behind a single [`RwLock`]. Transactions validate and apply
//! under the write lock, so a reader never sees half a transaction. Reads
//! hold the read lock only for the duration of one call.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use multiverse_types::{CellHash, CellRecord, CommitRecord, Timeline, TimelineId, TxId};

use crate::StoreError;
use crate::substrate::Substrate;
use crate::transaction::{Transaction, TxOp, TxReceipt};

/// Counts of everything held by a [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of timelines.
    pub timelines: usize,
    /// Number of distinct cell records.
    pub records: usize,
    /// Number of commits across all timelines.
    pub commits: usize,
    /// Number of membership facts (asserted plus retracted hashes) across
    /// all commits.
    pub facts: usize,
}

#[derive(Debug)]
struct TimelineEntry {
    timeline: Timeline,
    created: TxId,
    commits: Vec<CommitRecord>,
}

impl TimelineEntry {
    fn visible_len(&self, as_of: TxId) -> usize {
        self.commits.partition_point(|c| c.tx <= as_of)
    }

    fn visible(&self, as_of: TxId) -> &[CommitRecord] {
        self.commits
            .get(..self.visible_len(as_of))
            .unwrap_or_default()
    }
}

#[derive(Debug)]
struct StoreState {
    last_tx: TxId,
    names: BTreeMap<String, TimelineId>,
    timelines: BTreeMap<TimelineId, TimelineEntry>,
    records: BTreeMap<CellHash, CellRecord>,
}

impl StoreState {
    const fn new() -> Self {
        Self {
            last_tx: TxId::GENESIS,
            names: BTreeMap::new(),
            timelines: BTreeMap::new(),
            records: BTreeMap::new(),
        }
    }

    fn entry(&self, id: TimelineId, as_of: TxId) -> Result<&TimelineEntry, StoreError> {
        self.timelines
            .get(&id)
            .filter(|e| e.created <= as_of)
            .ok_or(StoreError::UnknownTimeline(id))
    }

    fn commit_len(&self, id: TimelineId) -> u64 {
        self.timelines
            .get(&id)
            .map_or(0, |e| u64::try_from(e.commits.len()).unwrap_or(u64::MAX))
    }
}

/// What validation learned about a transaction before it is applied.
#[derive(Debug, Default)]
struct Staged {
    names: BTreeSet<String>,
    timelines: BTreeSet<TimelineId>,
    records: BTreeMap<CellHash, CellRecord>,
    appended: BTreeMap<TimelineId, u64>,
}

impl Staged {
    fn knows_record(&self, state: &StoreState, hash: CellHash) -> bool {
        self.records.contains_key(&hash) || state.records.contains_key(&hash)
    }
}

/// Check every operation against current state plus the effects of the
/// operations before it. Nothing is written.
fn validate(state: &StoreState, tx: &Transaction) -> Result<Staged, StoreError> {
    if tx.is_empty() {
        return Err(StoreError::EmptyTransaction);
    }

    let mut staged = Staged::default();
    for op in tx.ops() {
        match op {
            TxOp::CreateTimeline(timeline) => {
                if timeline.name.trim().is_empty() {
                    return Err(StoreError::InvalidName(timeline.name.clone()));
                }
                if state.names.contains_key(&timeline.name)
                    || staged.names.contains(&timeline.name)
                {
                    return Err(StoreError::NameTaken(timeline.name.clone()));
                }
                if state.timelines.contains_key(&timeline.id)
                    || !staged.timelines.insert(timeline.id)
                {
                    return Err(StoreError::DuplicateTimelineId(timeline.id));
                }
                staged.names.insert(timeline.name.clone());
            }
            TxOp::InternRecord(record) => {
                let known = staged
                    .records
                    .get(&record.hash)
                    .or_else(|| state.records.get(&record.hash));
                match known {
                    Some(existing) if existing.cell() != record.cell() => {
                        return Err(StoreError::HashCollision {
                            hash: record.hash,
                            existing: existing.cell(),
                            incoming: record.cell(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        staged.records.insert(record.hash, *record);
                    }
                }
            }
            TxOp::AppendCommit(draft) => {
                if !state.timelines.contains_key(&draft.timeline)
                    && !staged.timelines.contains(&draft.timeline)
                {
                    return Err(StoreError::UnknownTimeline(draft.timeline));
                }
                let pending = staged.appended.entry(draft.timeline).or_insert(0);
                let expected = state.commit_len(draft.timeline).saturating_add(*pending);
                if draft.step != expected {
                    return Err(StoreError::StepConflict {
                        timeline: draft.timeline,
                        expected,
                        found: draft.step,
                    });
                }
                *pending = pending.saturating_add(1);

                if !draft.asserted.is_disjoint(&draft.retracted) {
                    return Err(StoreError::OverlappingDelta {
                        timeline: draft.timeline,
                        step: draft.step,
                    });
                }
                let referenced = draft
                    .asserted
                    .iter()
                    .chain(draft.retracted.iter())
                    .chain(draft.checkpoint.iter().flatten());
                for &hash in referenced {
                    if !staged.knows_record(state, hash) {
                        return Err(StoreError::UnknownRecord(hash));
                    }
                }
            }
        }
    }
    Ok(staged)
}

/// In-memory [`Substrate`].
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, StoreError> {
        self.state
            .read()
            .map_err(|_poisoned| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, StoreError> {
        self.state
            .write()
            .map_err(|_poisoned| StoreError::LockPoisoned)
    }

    /// Return counts of timelines, records, commits, and facts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let state = self.read()?;
        let mut stats = StoreStats {
            timelines: state.timelines.len(),
            records: state.records.len(),
            ..StoreStats::default()
        };
        for entry in state.timelines.values() {
            stats.commits = stats.commits.saturating_add(entry.commits.len());
            for commit in &entry.commits {
                stats.facts = stats
                    .facts
                    .saturating_add(commit.asserted.len())
                    .saturating_add(commit.retracted.len());
            }
        }
        Ok(stats)
    }
}

impl Substrate for MemoryStore {
    fn basis(&self) -> Result<TxId, StoreError> {
        Ok(self.read()?.last_tx)
    }

    fn transact(&self, tx: Transaction) -> Result<TxReceipt, StoreError> {
        let mut state = self.write()?;
        let staged = match validate(&state, &tx) {
            Ok(staged) => staged,
            Err(e) => {
                tracing::debug!(error = %e, ops = tx.len(), "Rejected transaction");
                return Err(e);
            }
        };

        let tx_id = state.last_tx.next();
        let now = Utc::now();
        let mut receipt = TxReceipt {
            tx: tx_id,
            committed_at: now,
            timelines_created: staged.timelines.len(),
            records_interned: staged.records.len(),
            commits: Vec::new(),
        };

        for op in tx.into_ops() {
            match op {
                TxOp::CreateTimeline(timeline) => {
                    state.names.insert(timeline.name.clone(), timeline.id);
                    state.timelines.insert(
                        timeline.id,
                        TimelineEntry {
                            timeline,
                            created: tx_id,
                            commits: Vec::new(),
                        },
                    );
                }
                TxOp::InternRecord(record) => {
                    state.records.entry(record.hash).or_insert(record);
                }
                TxOp::AppendCommit(draft) => {
                    if let Some(entry) = state.timelines.get_mut(&draft.timeline) {
                        receipt.commits.push((draft.timeline, draft.step));
                        entry.commits.push(CommitRecord {
                            id: draft.id,
                            timeline: draft.timeline,
                            step: draft.step,
                            tx: tx_id,
                            committed_at: draft.committed_at.unwrap_or(now),
                            asserted: draft.asserted,
                            retracted: draft.retracted,
                            checkpoint: draft.checkpoint,
                        });
                    }
                }
            }
        }
        state.last_tx = tx_id;

        tracing::debug!(
            tx = %tx_id,
            timelines_created = receipt.timelines_created,
            records_interned = receipt.records_interned,
            commits = receipt.commits.len(),
            "Applied transaction"
        );
        Ok(receipt)
    }

    fn timeline_by_name(&self, name: &str, as_of: TxId) -> Result<Option<Timeline>, StoreError> {
        let state = self.read()?;
        Ok(state
            .names
            .get(name)
            .and_then(|id| state.entry(*id, as_of).ok())
            .map(|e| e.timeline.clone()))
    }

    fn timeline_by_id(
        &self,
        id: TimelineId,
        as_of: TxId,
    ) -> Result<Option<Timeline>, StoreError> {
        let state = self.read()?;
        Ok(state.entry(id, as_of).ok().map(|e| e.timeline.clone()))
    }

    fn timelines(&self, as_of: TxId) -> Result<Vec<Timeline>, StoreError> {
        let state = self.read()?;
        Ok(state
            .names
            .values()
            .filter_map(|id| state.entry(*id, as_of).ok())
            .map(|e| e.timeline.clone())
            .collect())
    }

    fn commit_count(&self, timeline: TimelineId, as_of: TxId) -> Result<u64, StoreError> {
        let state = self.read()?;
        let len = state.entry(timeline, as_of)?.visible_len(as_of);
        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }

    fn commits(
        &self,
        timeline: TimelineId,
        steps: Range<u64>,
        as_of: TxId,
    ) -> Result<Vec<CommitRecord>, StoreError> {
        let state = self.read()?;
        let visible = state.entry(timeline, as_of)?.visible(as_of);
        let start = usize::try_from(steps.start).unwrap_or(usize::MAX);
        let end = usize::try_from(steps.end)
            .unwrap_or(usize::MAX)
            .min(visible.len());
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(visible.get(start..end).map(<[_]>::to_vec).unwrap_or_default())
    }

    fn latest_checkpoint(
        &self,
        timeline: TimelineId,
        step: u64,
        as_of: TxId,
    ) -> Result<Option<u64>, StoreError> {
        let state = self.read()?;
        let visible = state.entry(timeline, as_of)?.visible(as_of);
        // Commit `i` of the log is step `i`, so the scan starts at `step`.
        let end = usize::try_from(step)
            .map_or(visible.len(), |s| s.saturating_add(1).min(visible.len()));
        Ok(visible
            .get(..end)
            .unwrap_or_default()
            .iter()
            .rev()
            .find(|c| c.checkpoint.is_some())
            .map(|c| c.step))
    }

    fn record(&self, hash: CellHash) -> Result<Option<CellRecord>, StoreError> {
        Ok(self.read()?.records.get(&hash).copied())
    }

    fn records(
        &self,
        hashes: &BTreeSet<CellHash>,
    ) -> Result<BTreeMap<CellHash, CellRecord>, StoreError> {
        let state = self.read()?;
        hashes
            .iter()
            .map(|hash| {
                state
                    .records
                    .get(hash)
                    .map(|r| (*hash, *r))
                    .ok_or(StoreError::UnknownRecord(*hash))
            })
            .collect()
    }
}
