//! The [`Multiverse`] handle and timeline reads.
//!
//! A [`Multiverse`] owns a [`Substrate`] and the [`CellHasher`] used to
//! address cells. Every public operation captures a read basis from the
//! substrate when it starts and performs all of its reads against that
//! basis, so an operation never observes a half-applied commit or a commit
//! that landed while it was running.
//!
//! Commit, history, branch, and export operations are implemented in their
//! own modules as further `impl` blocks on [`Multiverse`].

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use multiverse_cells::{BoardDiff, CellHasher, ContentHasher, diff};
use multiverse_store::{MemoryStore, Substrate, Transaction};
use multiverse_types::{Board, Timeline, TimelineId, TxId};

use crate::config::StoreConfig;
use crate::error::MultiverseError;

/// Handle over a set of named, branchable timelines.
pub struct Multiverse<S: Substrate = MemoryStore> {
    pub(crate) store: S,
    pub(crate) hasher: Arc<dyn CellHasher>,
    pub(crate) checkpoint_interval: Option<u64>,
}

impl<S: Substrate + core::fmt::Debug> core::fmt::Debug for Multiverse<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Multiverse")
            .field("store", &self.store)
            .field("hasher", &self.hasher)
            .field("checkpoint_interval", &self.checkpoint_interval)
            .finish()
    }
}

impl Multiverse<MemoryStore> {
    /// Create an empty in-memory multiverse without checkpoints.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Create an empty in-memory multiverse from a store config section.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new().with_checkpoint_interval(config.checkpoint_interval)
    }
}

impl Default for Multiverse<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Substrate> Multiverse<S> {
    /// Wrap an existing substrate, using the default [`ContentHasher`].
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            hasher: Arc::new(ContentHasher::new()),
            checkpoint_interval: None,
        }
    }

    /// Replace the cell hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn CellHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Write a full-board checkpoint on every step that is a positive
    /// multiple of `interval`. `None` or `Some(0)` disables checkpoints.
    #[must_use]
    pub fn with_checkpoint_interval(mut self, interval: Option<u64>) -> Self {
        self.checkpoint_interval = interval.filter(|&n| n > 0);
        self
    }

    /// Return the underlying substrate.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Return the configured checkpoint interval.
    pub const fn checkpoint_interval(&self) -> Option<u64> {
        self.checkpoint_interval
    }

    /// Create an empty timeline.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::NameCollision`] if the name is taken.
    pub fn create(&self, name: &str) -> Result<Timeline, MultiverseError> {
        let basis = self.store.basis()?;
        if self.store.timeline_by_name(name, basis)?.is_some() {
            return Err(MultiverseError::NameCollision {
                name: name.to_owned(),
            });
        }
        let timeline = Timeline {
            id: TimelineId::new(),
            name: name.to_owned(),
            created_at: Utc::now(),
            origin: None,
        };
        self.store
            .transact(Transaction::new().create_timeline(timeline.clone()))?;
        info!(timeline = name, id = %timeline.id, "Created timeline");
        Ok(timeline)
    }

    /// Look up a timeline by name.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name.
    pub fn timeline(&self, name: &str) -> Result<Timeline, MultiverseError> {
        let basis = self.store.basis()?;
        self.resolve(name, basis)
    }

    /// All timelines, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::Store`] if the substrate fails.
    pub fn timelines(&self) -> Result<Vec<Timeline>, MultiverseError> {
        let basis = self.store.basis()?;
        Ok(self.store.timelines(basis)?)
    }

    /// Number of commits on a timeline.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name.
    pub fn commit_count(&self, name: &str) -> Result<u64, MultiverseError> {
        let basis = self.store.basis()?;
        let timeline = self.resolve(name, basis)?;
        Ok(self.store.commit_count(timeline.id, basis)?)
    }

    /// Board of the highest commit, or the empty board if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name.
    pub fn latest_board(&self, name: &str) -> Result<Board, MultiverseError> {
        let basis = self.store.basis()?;
        let timeline = self.resolve(name, basis)?;
        self.latest_at(timeline.id, basis)
    }

    /// Difference between the boards at two steps of one timeline.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name and
    /// [`MultiverseError::StepOutOfRange`] if either step does not exist.
    pub fn diff_steps(&self, name: &str, from: u64, to: u64) -> Result<BoardDiff, MultiverseError> {
        let basis = self.store.basis()?;
        let timeline = self.resolve(name, basis)?;
        let commits = self.store.commit_count(timeline.id, basis)?;
        let out_of_range = |step: u64| MultiverseError::StepOutOfRange {
            timeline: name.to_owned(),
            step,
            commits,
        };
        if from >= commits {
            return Err(out_of_range(from));
        }
        if to >= commits {
            return Err(out_of_range(to));
        }
        let old = self.replay_to(timeline.id, from, basis)?;
        let new = self.replay_to(timeline.id, to, basis)?;
        Ok(diff(&old, &new))
    }

    /// Resolve a name to a timeline as of `basis`.
    pub(crate) fn resolve(&self, name: &str, basis: TxId) -> Result<Timeline, MultiverseError> {
        self.store
            .timeline_by_name(name, basis)?
            .ok_or_else(|| MultiverseError::TimelineNotFound {
                name: name.to_owned(),
            })
    }

    /// Board of the highest commit visible at `basis`.
    pub(crate) fn latest_at(&self, id: TimelineId, basis: TxId) -> Result<Board, MultiverseError> {
        match self.store.commit_count(id, basis)?.checked_sub(1) {
            Some(last) => self.replay_to(id, last, basis),
            None => Ok(Board::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use multiverse_types::Cell;

    use super::*;
    use crate::error::ErrorKind;

    fn board(cells: &[(i32, i32)]) -> Board {
        cells.iter().copied().map(Cell::from).collect()
    }

    #[test]
    fn create_then_read_empty() {
        let mv = Multiverse::new();
        let created = mv.create("main").unwrap();
        assert_eq!(mv.timeline("main").unwrap(), created);
        assert_eq!(mv.commit_count("main").unwrap(), 0);
        assert!(mv.latest_board("main").unwrap().is_empty());
    }

    #[test]
    fn create_twice_is_name_collision() {
        let mv = Multiverse::new();
        mv.create("T").unwrap();
        let err = mv.create("T").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameCollision);
    }

    #[test]
    fn unknown_timeline_is_not_found() {
        let mv = Multiverse::new();
        assert_eq!(mv.latest_board("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(mv.commit_count("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(mv.timeline("nope").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn timelines_are_listed_by_name() {
        let mv = Multiverse::new();
        mv.create("b").unwrap();
        mv.create("a").unwrap();
        let names: Vec<String> = mv.timelines().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn diff_steps_between_commits() {
        let mv = Multiverse::new();
        mv.commit("T", &board(&[(1, 1), (2, 2)])).unwrap();
        mv.commit("T", &board(&[(2, 2), (3, 3)])).unwrap();

        let delta = mv.diff_steps("T", 0, 1).unwrap();
        assert_eq!(delta.added, board(&[(3, 3)]));
        assert_eq!(delta.removed, board(&[(1, 1)]));
        assert_eq!(delta.unchanged, board(&[(2, 2)]));

        assert_eq!(mv.diff_steps("T", 0, 2).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn zero_checkpoint_interval_disables() {
        let mv = Multiverse::new().with_checkpoint_interval(Some(0));
        assert_eq!(mv.checkpoint_interval(), None);
        let mv = Multiverse::from_config(&StoreConfig::default());
        assert_eq!(mv.checkpoint_interval(), Some(16));
    }
}
