//! Error types for the `multiverse-core` crate.

use multiverse_cells::CellError;
use multiverse_store::StoreError;
use multiverse_types::StepError;

use crate::oracle::OracleError;

/// Coarse classification of a [`MultiverseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A timeline name is already in use.
    NameCollision,
    /// A timeline or step does not exist.
    NotFound,
    /// Stored or incoming data would break an invariant (hash collision,
    /// duplicate cell, inconsistent delta).
    IntegrityViolation,
    /// A step index could not be used.
    InvalidStep,
    /// The substrate failed for another reason.
    Store,
    /// The board oracle failed.
    Oracle,
}

/// Errors raised by timeline operations.
#[derive(Debug, thiserror::Error)]
pub enum MultiverseError {
    /// A timeline with this name already exists.
    #[error("timeline already exists: {name}")]
    NameCollision {
        /// The requested name.
        name: String,
    },

    /// No timeline with this name exists.
    #[error("timeline not found: {name}")]
    TimelineNotFound {
        /// The requested name.
        name: String,
    },

    /// The timeline has no commit at the requested step.
    #[error("timeline {timeline} has {commits} commits, step {step} does not exist")]
    StepOutOfRange {
        /// The timeline name.
        timeline: String,
        /// The requested step.
        step: u64,
        /// Number of commits on the timeline.
        commits: u64,
    },

    /// An imported timeline failed validation.
    #[error("invalid export of {timeline}: {reason}")]
    InvalidExport {
        /// The timeline name in the export.
        timeline: String,
        /// What was wrong.
        reason: String,
    },

    /// A board could not be built or hashed.
    #[error("cell error: {source}")]
    Cell {
        /// The underlying cell error.
        #[from]
        source: CellError,
    },

    /// The substrate rejected an operation.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// A step index was invalid.
    #[error("invalid step: {source}")]
    Step {
        /// The underlying step error.
        #[from]
        source: StepError,
    },

    /// The oracle failed to produce a board.
    #[error("oracle error: {source}")]
    Oracle {
        /// The underlying oracle error.
        #[from]
        source: OracleError,
    },
}

impl MultiverseError {
    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NameCollision { .. } => ErrorKind::NameCollision,
            Self::TimelineNotFound { .. } | Self::StepOutOfRange { .. } => ErrorKind::NotFound,
            Self::InvalidExport { .. } | Self::Cell { .. } => ErrorKind::IntegrityViolation,
            Self::Step { .. } => ErrorKind::InvalidStep,
            Self::Oracle { .. } => ErrorKind::Oracle,
            Self::Store { source } => match source {
                StoreError::NameTaken(_) => ErrorKind::NameCollision,
                StoreError::UnknownTimeline(_) => ErrorKind::NotFound,
                StoreError::HashCollision { .. }
                | StoreError::UnknownRecord(_)
                | StoreError::OverlappingDelta { .. }
                | StoreError::DuplicateTimelineId(_) => ErrorKind::IntegrityViolation,
                StoreError::EmptyTransaction
                | StoreError::InvalidName(_)
                | StoreError::StepConflict { .. }
                | StoreError::LockPoisoned => ErrorKind::Store,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use multiverse_types::{Cell, CellHash, TimelineId};

    use super::*;

    #[test]
    fn store_errors_are_classified() {
        let taken = MultiverseError::from(StoreError::NameTaken("main".to_owned()));
        assert_eq!(taken.kind(), ErrorKind::NameCollision);

        let collision = MultiverseError::from(StoreError::HashCollision {
            hash: CellHash(1),
            existing: Cell::new(0, 0),
            incoming: Cell::new(1, 1),
        });
        assert_eq!(collision.kind(), ErrorKind::IntegrityViolation);

        let missing = MultiverseError::from(StoreError::UnknownTimeline(TimelineId::new()));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let conflict = MultiverseError::from(StoreError::StepConflict {
            timeline: TimelineId::new(),
            expected: 1,
            found: 2,
        });
        assert_eq!(conflict.kind(), ErrorKind::Store);
    }

    #[test]
    fn local_errors_are_classified() {
        let out_of_range = MultiverseError::StepOutOfRange {
            timeline: "main".to_owned(),
            step: 5,
            commits: 2,
        };
        assert_eq!(out_of_range.kind(), ErrorKind::NotFound);
        assert!(out_of_range.to_string().contains("step 5"));

        let duplicate = MultiverseError::from(CellError::DuplicateCell(Cell::new(3, 3)));
        assert_eq!(duplicate.kind(), ErrorKind::IntegrityViolation);

        let step = MultiverseError::from(StepError::Negative(-1));
        assert_eq!(step.kind(), ErrorKind::InvalidStep);
    }
}
