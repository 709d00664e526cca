//! Branching.
//!
//! A branch is a new timeline whose step 0 is a value copy of some board:
//! a source timeline at a chosen step, optionally modified, or the union of
//! two sources. Nothing links the branch's commit log to its source, so
//! later commits on either side are invisible to the other. The fork point
//! is kept only as [`BranchOrigin`] metadata on the new timeline.

use std::collections::BTreeSet;

use tracing::info;

use multiverse_cells::{merge_boards, modify};
use multiverse_store::Substrate;
use multiverse_types::{Board, BranchOrigin, StepSelector, Timeline, TimelineId, TxId};

use crate::commit::{Target, fresh_timeline};
use crate::error::MultiverseError;
use crate::timeline::Multiverse;

impl<S: Substrate> Multiverse<S> {
    /// Fork `new_name` from `source` at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::NameCollision`] if `new_name` exists,
    /// [`MultiverseError::TimelineNotFound`] for an unknown source, and
    /// [`MultiverseError::StepOutOfRange`] if the step does not exist.
    pub fn branch(
        &self,
        source: &str,
        at: StepSelector,
        new_name: &str,
    ) -> Result<Timeline, MultiverseError> {
        self.branch_modified(source, at, &Board::new(), &Board::new(), new_name)
    }

    /// Fork `new_name` from `source` at `at`, with `add` and `remove`
    /// applied to the forked board. Additions win over removals.
    ///
    /// # Errors
    ///
    /// As [`branch`](Self::branch).
    pub fn branch_modified(
        &self,
        source: &str,
        at: StepSelector,
        add: &Board,
        remove: &Board,
        new_name: &str,
    ) -> Result<Timeline, MultiverseError> {
        let basis = self.store.basis()?;
        self.ensure_free(new_name, basis)?;
        let (origin, board) = self.select(source, at, basis)?;
        let board = modify(&board, add, remove);
        self.seed_branch(new_name, origin, &board)
    }

    /// Create `new_name` whose step 0 is the union of two source boards.
    ///
    /// The origin recorded on the new timeline is the left source.
    ///
    /// # Errors
    ///
    /// As [`branch`](Self::branch), for either source.
    pub fn branch_merged(
        &self,
        left: (&str, StepSelector),
        right: (&str, StepSelector),
        new_name: &str,
    ) -> Result<Timeline, MultiverseError> {
        let basis = self.store.basis()?;
        self.ensure_free(new_name, basis)?;
        let (origin, left_board) = self.select(left.0, left.1, basis)?;
        let (_, right_board) = self.select(right.0, right.1, basis)?;
        self.seed_branch(new_name, origin, &merge_boards(&left_board, &right_board))
    }

    /// Fork points from `name` back to its root, nearest first.
    ///
    /// A root timeline has an empty lineage.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name.
    pub fn lineage(&self, name: &str) -> Result<Vec<BranchOrigin>, MultiverseError> {
        let basis = self.store.basis()?;
        let mut current = self.resolve(name, basis)?;
        let mut seen: BTreeSet<TimelineId> = BTreeSet::new();
        let mut chain = Vec::new();
        while let Some(origin) = current.origin.take() {
            if !seen.insert(origin.source) {
                break;
            }
            let parent = self.store.timeline_by_id(origin.source, basis)?;
            chain.push(origin);
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(chain)
    }

    fn ensure_free(&self, name: &str, basis: TxId) -> Result<(), MultiverseError> {
        if self.store.timeline_by_name(name, basis)?.is_some() {
            return Err(MultiverseError::NameCollision {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Resolve a source timeline and step to its board.
    fn select(
        &self,
        source: &str,
        at: StepSelector,
        basis: TxId,
    ) -> Result<(BranchOrigin, Board), MultiverseError> {
        let timeline = self.resolve(source, basis)?;
        let commits = self.store.commit_count(timeline.id, basis)?;
        let step = match at {
            StepSelector::At(step) => step,
            StepSelector::Latest => commits.checked_sub(1).ok_or_else(|| {
                MultiverseError::StepOutOfRange {
                    timeline: source.to_owned(),
                    step: 0,
                    commits,
                }
            })?,
        };
        if step >= commits {
            return Err(MultiverseError::StepOutOfRange {
                timeline: source.to_owned(),
                step,
                commits,
            });
        }
        let board = self.replay_to(timeline.id, step, basis)?;
        let origin = BranchOrigin {
            source: timeline.id,
            source_name: timeline.name,
            step,
        };
        Ok((origin, board))
    }

    fn seed_branch(
        &self,
        new_name: &str,
        origin: BranchOrigin,
        board: &Board,
    ) -> Result<Timeline, MultiverseError> {
        let timeline = fresh_timeline(new_name, Some(origin));
        let report = self.write_commit(
            new_name,
            Target::New(timeline.clone()),
            &Board::new(),
            board,
        )?;
        if let Some(origin) = &timeline.origin {
            info!(
                source = %origin.source_name,
                step = origin.step,
                branch = new_name,
                cells = board.len(),
                tx = %report.tx,
                "Branched timeline"
            );
        }
        Ok(timeline)
    }
}
