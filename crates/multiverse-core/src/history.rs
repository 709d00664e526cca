//! History reconstruction.
//!
//! A timeline stores only deltas, so every historical board is rebuilt by
//! replay:
//!
//! ```text
//! B := {}
//! for i in start..=target:
//!     B := (B - removed(i)) + added(i)
//! ```
//!
//! Replay works on record hashes and resolves them to cells in one batch at
//! the end. When the log holds a full-board checkpoint at or before the
//! target, replay starts from the newest such checkpoint instead of step 0.
//!
//! [`History`] is the materialized form used for sequential reads. It is
//! captured when requested and does not change as the timeline grows, and it
//! can be iterated any number of times.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use multiverse_store::Substrate;
use multiverse_types::{Board, Cell, CellHash, CellRecord, CommitRecord, TimelineId, TxId};

use crate::error::MultiverseError;
use crate::timeline::Multiverse;

/// One commit with its hashes resolved to cells.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedDelta {
    step: u64,
    added: Vec<Cell>,
    removed: Vec<Cell>,
}

/// A captured, restartable sequence of boards from one timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    timeline: String,
    baseline: Board,
    baseline_step: Option<u64>,
    deltas: Vec<ResolvedDelta>,
}

impl History {
    /// Name of the timeline the history was read from.
    pub fn timeline(&self) -> &str {
        &self.timeline
    }

    /// Board the replay starts from; empty for a full history.
    pub const fn baseline(&self) -> &Board {
        &self.baseline
    }

    /// Step of the baseline board, or `None` for a full history.
    pub const fn baseline_step(&self) -> Option<u64> {
        self.baseline_step
    }

    /// Number of boards the history yields.
    pub const fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Whether the history yields no boards.
    pub const fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Iterate `(step, board)` pairs in step order.
    pub fn iter(&self) -> HistoryIter<'_> {
        HistoryIter {
            deltas: self.deltas.iter(),
            board: self.baseline.clone(),
        }
    }

    /// Collect every board in step order.
    pub fn boards(&self) -> Vec<Board> {
        self.iter().map(|(_, board)| board).collect()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = (u64, Board);
    type IntoIter = HistoryIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`History`].
#[derive(Debug, Clone)]
pub struct HistoryIter<'a> {
    deltas: core::slice::Iter<'a, ResolvedDelta>,
    board: Board,
}

impl Iterator for HistoryIter<'_> {
    type Item = (u64, Board);

    fn next(&mut self) -> Option<Self::Item> {
        let delta = self.deltas.next()?;
        for cell in &delta.removed {
            self.board.remove(cell);
        }
        self.board.extend(delta.added.iter().copied());
        Some((delta.step, self.board.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.deltas.size_hint()
    }
}

impl ExactSizeIterator for HistoryIter<'_> {}

/// Every hash a set of commits refers to.
fn referenced_hashes<'a, I: IntoIterator<Item = &'a CommitRecord>>(commits: I) -> BTreeSet<CellHash> {
    let mut hashes = BTreeSet::new();
    for commit in commits {
        hashes.extend(commit.asserted.iter().copied());
        hashes.extend(commit.retracted.iter().copied());
    }
    hashes
}

fn cells_of(hashes: &BTreeSet<CellHash>, records: &BTreeMap<CellHash, CellRecord>) -> Vec<Cell> {
    hashes
        .iter()
        .filter_map(|hash| records.get(hash).map(CellRecord::cell))
        .collect()
}

impl<S: Substrate> Multiverse<S> {
    /// Board of a timeline at `step`.
    ///
    /// Returns `Ok(None)` when the step is at or beyond the number of
    /// commits, which is distinct from an empty board.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name.
    pub fn board_at(&self, name: &str, step: u64) -> Result<Option<Board>, MultiverseError> {
        let basis = self.store.basis()?;
        let timeline = self.resolve(name, basis)?;
        if step >= self.store.commit_count(timeline.id, basis)? {
            return Ok(None);
        }
        self.replay_to(timeline.id, step, basis).map(Some)
    }

    /// Every board of a timeline from step 0, captured now.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name.
    pub fn full_history(&self, name: &str) -> Result<History, MultiverseError> {
        let basis = self.store.basis()?;
        let timeline = self.resolve(name, basis)?;
        let count = self.store.commit_count(timeline.id, basis)?;
        let commits = self.store.commits(timeline.id, 0..count, basis)?;
        self.materialize(name, Board::new(), None, &commits)
    }

    /// Boards after `from_step`, replayed from the board at `from_step`.
    ///
    /// The baseline itself is not yielded.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name and
    /// [`MultiverseError::StepOutOfRange`] if `from_step` does not exist.
    pub fn full_history_from(&self, name: &str, from_step: u64) -> Result<History, MultiverseError> {
        let basis = self.store.basis()?;
        let timeline = self.resolve(name, basis)?;
        let count = self.store.commit_count(timeline.id, basis)?;
        if from_step >= count {
            return Err(MultiverseError::StepOutOfRange {
                timeline: name.to_owned(),
                step: from_step,
                commits: count,
            });
        }
        let baseline = self.replay_to(timeline.id, from_step, basis)?;
        let commits = self
            .store
            .commits(timeline.id, from_step.saturating_add(1)..count, basis)?;
        self.materialize(name, baseline, Some(from_step), &commits)
    }

    /// Rebuild the board at `target`, which must exist at `basis`.
    pub(crate) fn replay_to(
        &self,
        id: TimelineId,
        target: u64,
        basis: TxId,
    ) -> Result<Board, MultiverseError> {
        let checkpoint = self.store.latest_checkpoint(id, target, basis)?;
        let start = checkpoint.unwrap_or(0);
        let commits = self
            .store
            .commits(id, start..target.saturating_add(1), basis)?;

        let mut live: BTreeSet<CellHash> = BTreeSet::new();
        for commit in &commits {
            match &commit.checkpoint {
                Some(full) if checkpoint == Some(commit.step) => live.clone_from(full),
                _ => {
                    for hash in &commit.retracted {
                        live.remove(hash);
                    }
                    live.extend(commit.asserted.iter().copied());
                }
            }
        }

        let records = self.store.records(&live)?;
        debug!(
            timeline = %id,
            target,
            checkpoint = ?checkpoint,
            replayed = commits.len(),
            cells = records.len(),
            "Replayed board"
        );
        Ok(records.values().map(CellRecord::cell).collect())
    }

    fn materialize(
        &self,
        name: &str,
        baseline: Board,
        baseline_step: Option<u64>,
        commits: &[CommitRecord],
    ) -> Result<History, MultiverseError> {
        let records = self.store.records(&referenced_hashes(commits))?;
        let deltas = commits
            .iter()
            .map(|commit| ResolvedDelta {
                step: commit.step,
                added: cells_of(&commit.asserted, &records),
                removed: cells_of(&commit.retracted, &records),
            })
            .collect();
        Ok(History {
            timeline: name.to_owned(),
            baseline,
            baseline_step,
            deltas,
        })
    }
}
