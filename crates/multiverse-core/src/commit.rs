//! The commit engine.
//!
//! A commit turns a raw board into the smallest possible change against the
//! timeline's previous board:
//!
//! 1. Capture a read basis and rebuild the previous board (empty when the
//!    timeline is new or has no commits).
//! 2. Diff the previous board against the raw board.
//! 3. Hash the new board once, failing on any collision between distinct
//!    cells before anything is written.
//! 4. Send one transaction: create the timeline if needed, intern records
//!    for added cells, and append the delta. Unchanged cells are not
//!    written. Records already stored are reused by the substrate.
//!
//! The delta is computed outside the substrate lock. If another writer
//! appends to the same timeline in between, the substrate rejects the
//! append with a step conflict and nothing is written.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, info, warn};

use multiverse_cells::{board_from_cells, diff, hash_board};
use multiverse_store::{CommitDraft, Substrate, Transaction};
use multiverse_types::{Board, BranchOrigin, Cell, CellHash, Timeline, TimelineId, TxId};

use crate::error::MultiverseError;
use crate::timeline::Multiverse;

/// What a successful commit wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    /// The timeline committed to.
    pub timeline: TimelineId,
    /// The step the commit was recorded as.
    pub step: u64,
    /// Transaction marker under which the commit became visible.
    pub tx: TxId,
    /// Cells that became alive.
    pub added: usize,
    /// Cells that stopped being alive.
    pub removed: usize,
    /// Records newly interned (records reused from earlier commits excluded).
    pub records_interned: usize,
    /// Whether a full-board checkpoint was written.
    pub checkpoint: bool,
    /// Whether the commit created the timeline.
    pub created: bool,
}

/// Where a commit lands.
pub(crate) enum Target {
    /// Append to an existing timeline whose next step is `next_step`.
    Existing {
        /// Timeline identifier.
        id: TimelineId,
        /// Step the append must name.
        next_step: u64,
    },
    /// Create the timeline in the same transaction and write step 0.
    New(Timeline),
}

/// Build a timeline header that has not been stored yet.
pub(crate) fn fresh_timeline(name: &str, origin: Option<BranchOrigin>) -> Timeline {
    Timeline {
        id: TimelineId::new(),
        name: name.to_owned(),
        created_at: Utc::now(),
        origin,
    }
}

impl<S: Substrate> Multiverse<S> {
    /// Commit a board to a timeline, creating the timeline if needed.
    ///
    /// Returns the new step: 0 for the first commit, previous step + 1
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error of kind
    /// [`IntegrityViolation`](crate::ErrorKind::IntegrityViolation) if two
    /// distinct cells hash alike, in which case nothing is written.
    pub fn commit(&self, name: &str, board: &Board) -> Result<u64, MultiverseError> {
        self.commit_report(name, board).map(|report| report.step)
    }

    /// Commit an unvalidated cell list.
    ///
    /// # Errors
    ///
    /// As [`commit`](Self::commit), plus an
    /// [`IntegrityViolation`](crate::ErrorKind::IntegrityViolation) if the
    /// list repeats a coordinate.
    pub fn commit_cells(&self, name: &str, cells: &[Cell]) -> Result<u64, MultiverseError> {
        let board = board_from_cells(cells)?;
        self.commit(name, &board)
    }

    /// Commit a board and report what was written.
    ///
    /// # Errors
    ///
    /// As [`commit`](Self::commit).
    pub fn commit_report(&self, name: &str, board: &Board) -> Result<CommitReport, MultiverseError> {
        let basis = self.store.basis()?;
        let (target, previous) = match self.store.timeline_by_name(name, basis)? {
            Some(timeline) => {
                let next_step = self.store.commit_count(timeline.id, basis)?;
                let previous = self.latest_at(timeline.id, basis)?;
                (
                    Target::Existing {
                        id: timeline.id,
                        next_step,
                    },
                    previous,
                )
            }
            None => (Target::New(fresh_timeline(name, None)), Board::new()),
        };

        self.write_commit(name, target, &previous, board)
    }

    /// Diff, hash, and append `board` against `previous`.
    pub(crate) fn write_commit(
        &self,
        name: &str,
        target: Target,
        previous: &Board,
        board: &Board,
    ) -> Result<CommitReport, MultiverseError> {
        let result = self.try_write_commit(target, previous, board);
        match &result {
            Ok(report) => {
                if report.created {
                    info!(timeline = name, id = %report.timeline, "Created timeline");
                }
                debug!(
                    timeline = name,
                    step = report.step,
                    added = report.added,
                    removed = report.removed,
                    records_interned = report.records_interned,
                    checkpoint = report.checkpoint,
                    "Committed board"
                );
            }
            Err(e) => warn!(timeline = name, error = %e, "Rejected commit"),
        }
        result
    }

    fn try_write_commit(
        &self,
        target: Target,
        previous: &Board,
        board: &Board,
    ) -> Result<CommitReport, MultiverseError> {
        let delta = diff(previous, board);
        let records = hash_board(self.hasher.as_ref(), board)?;

        let asserted: BTreeSet<CellHash> = delta
            .added
            .iter()
            .map(|&cell| self.hasher.hash_cell(cell))
            .collect();
        let retracted: BTreeSet<CellHash> = delta
            .removed
            .iter()
            .map(|&cell| self.hasher.hash_cell(cell))
            .collect();

        let (id, step, created, mut tx) = match target {
            Target::Existing { id, next_step } => (id, next_step, false, Transaction::new()),
            Target::New(timeline) => (
                timeline.id,
                0,
                true,
                Transaction::new().create_timeline(timeline),
            ),
        };

        tx = tx.intern_all(
            records
                .values()
                .filter(|record| asserted.contains(&record.hash))
                .copied(),
        );

        let mut draft = CommitDraft::new(id, step)
            .asserting(asserted)
            .retracting(retracted);
        let checkpoint = self.is_checkpoint(step);
        if checkpoint {
            draft = draft.with_checkpoint(records.keys().copied().collect());
        }

        let receipt = self.store.transact(tx.append_commit(draft))?;
        Ok(CommitReport {
            timeline: id,
            step,
            tx: receipt.tx,
            added: delta.added.len(),
            removed: delta.removed.len(),
            records_interned: receipt.records_interned,
            checkpoint,
            created,
        })
    }

    fn is_checkpoint(&self, step: u64) -> bool {
        self.checkpoint_interval
            .is_some_and(|n| step > 0 && step.checked_rem(n) == Some(0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use multiverse_cells::CellHasher;
    use multiverse_store::MemoryStore;

    use super::*;
    use crate::error::ErrorKind;

    fn board(cells: &[(i32, i32)]) -> Board {
        cells.iter().copied().map(Cell::from).collect()
    }

    /// Maps every cell in a column to the same hash.
    #[derive(Debug)]
    struct ColumnHasher;

    impl CellHasher for ColumnHasher {
        fn hash_cell(&self, cell: Cell) -> CellHash {
            CellHash(u64::from(cell.x.unsigned_abs()))
        }
    }

    #[test]
    fn first_commit_is_step_zero_and_creates_timeline() {
        let mv = Multiverse::new();
        assert_eq!(mv.commit("T", &board(&[(1, 1)])).unwrap(), 0);
        assert!(mv.timeline("T").is_ok());
        assert_eq!(mv.commit("T", &board(&[(2, 2)])).unwrap(), 1);
    }

    #[test]
    fn commit_to_created_empty_timeline_is_step_zero() {
        let mv = Multiverse::new();
        mv.create("T").unwrap();
        assert_eq!(mv.commit("T", &Board::new()).unwrap(), 0);
        assert_eq!(mv.commit_count("T").unwrap(), 1);
    }

    #[test]
    fn report_counts_minimal_delta() {
        let mv = Multiverse::new();
        mv.commit("T", &board(&[(1, 1), (2, 2)])).unwrap();
        let report = mv.commit_report("T", &board(&[(2, 2), (3, 3)])).unwrap();
        assert_eq!(report.step, 1);
        assert_eq!(report.added, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.records_interned, 1);
    }

    #[test]
    fn unchanged_board_writes_empty_delta() {
        let mv = Multiverse::new();
        let b = board(&[(0, 0), (0, 1)]);
        mv.commit("T", &b).unwrap();
        let before = mv.store().stats().unwrap();
        let report = mv.commit_report("T", &b).unwrap();
        let after = mv.store().stats().unwrap();
        assert_eq!((report.added, report.removed), (0, 0));
        assert_eq!(after.facts, before.facts);
        assert_eq!(after.records, before.records);
        assert_eq!(after.commits, before.commits.saturating_add(1));
    }

    #[test]
    fn reappearing_cell_reuses_record() {
        let mv = Multiverse::new();
        mv.commit("T", &board(&[(4, 4)])).unwrap();
        mv.commit("T", &Board::new()).unwrap();
        let report = mv.commit_report("T", &board(&[(4, 4)])).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.records_interned, 0);
        assert_eq!(mv.store().stats().unwrap().records, 1);
    }

    #[test]
    fn records_shared_across_timelines() {
        let mv = Multiverse::new();
        mv.commit("a", &board(&[(1, 1), (2, 2)])).unwrap();
        mv.commit("b", &board(&[(1, 1), (2, 2)])).unwrap();
        assert_eq!(mv.store().stats().unwrap().records, 2);
    }

    #[test]
    fn commit_cells_rejects_duplicates() {
        let mv = Multiverse::new();
        let cells = [Cell::new(1, 1), Cell::new(1, 1)];
        let err = mv.commit_cells("T", &cells).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegrityViolation);
        assert!(mv.timeline("T").is_err());
    }

    #[test]
    fn collision_within_board_writes_nothing() {
        let mv = Multiverse::with_store(MemoryStore::new()).with_hasher(Arc::new(ColumnHasher));
        let err = mv.commit("T", &board(&[(1, 1), (1, 2)])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegrityViolation);
        assert!(mv.timeline("T").is_err());
        assert_eq!(mv.store().stats().unwrap().records, 0);
    }

    #[test]
    fn collision_against_stored_record_writes_nothing() {
        let mv = Multiverse::with_store(MemoryStore::new()).with_hasher(Arc::new(ColumnHasher));
        mv.commit("T", &board(&[(1, 1)])).unwrap();
        let err = mv.commit("U", &board(&[(1, 5)])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegrityViolation);
        assert!(mv.timeline("U").is_err());
        assert_eq!(mv.commit_count("T").unwrap(), 1);
    }

    #[test]
    fn checkpoints_on_interval_multiples() {
        let mv = Multiverse::new().with_checkpoint_interval(Some(2));
        let flags: Vec<bool> = (0..5)
            .map(|i| {
                mv.commit_report("T", &board(&[(i, 0)]))
                    .unwrap()
                    .checkpoint
            })
            .collect();
        assert_eq!(flags, vec![false, false, true, false, true]);
    }
}
