//! Bounded evolution loop.
//!
//! [`evolve`] drives a timeline forward: read the latest board, ask the
//! oracle for the next one, commit it, repeat. It stops after the requested
//! number of steps or at the first error. Commits made before an error stay
//! committed.

use tracing::{debug, info};

use multiverse_store::Substrate;

use crate::error::MultiverseError;
use crate::oracle::BoardOracle;
use crate::timeline::Multiverse;

/// Result of an evolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvolveSummary {
    /// The timeline evolved.
    pub timeline: String,
    /// Number of commits written.
    pub steps_run: u64,
    /// Step of the last commit written, if any.
    pub last_step: Option<u64>,
    /// Live cells after the last commit.
    pub population: usize,
    /// Total cells that became alive across the run.
    pub cells_added: usize,
    /// Total cells that stopped being alive across the run.
    pub cells_removed: usize,
    /// Total records newly interned across the run.
    pub records_interned: usize,
}

/// Evolve `timeline` by `steps` oracle generations.
///
/// The timeline must exist. An empty timeline evolves from the empty board.
///
/// # Errors
///
/// Returns [`MultiverseError::TimelineNotFound`] for an unknown name,
/// [`MultiverseError::Oracle`] if the oracle fails, and any commit error.
pub fn evolve<S: Substrate>(
    multiverse: &Multiverse<S>,
    timeline: &str,
    oracle: &mut dyn BoardOracle,
    steps: u64,
) -> Result<EvolveSummary, MultiverseError> {
    let mut board = multiverse.latest_board(timeline)?;
    let mut next_step = multiverse.commit_count(timeline)?;
    let mut summary = EvolveSummary {
        timeline: timeline.to_owned(),
        population: board.len(),
        ..EvolveSummary::default()
    };

    info!(
        timeline,
        steps,
        from_step = next_step,
        population = board.len(),
        "Evolution starting"
    );

    for _ in 0..steps {
        let next = oracle.next_board(next_step, &board)?;
        let report = multiverse.commit_report(timeline, &next)?;

        summary.steps_run = summary.steps_run.saturating_add(1);
        summary.last_step = Some(report.step);
        summary.cells_added = summary.cells_added.saturating_add(report.added);
        summary.cells_removed = summary.cells_removed.saturating_add(report.removed);
        summary.records_interned = summary
            .records_interned
            .saturating_add(report.records_interned);
        summary.population = next.len();

        debug!(
            timeline,
            step = report.step,
            population = next.len(),
            "Evolved step"
        );

        next_step = report.step.saturating_add(1);
        board = next;
    }

    info!(
        timeline,
        steps_run = summary.steps_run,
        last_step = ?summary.last_step,
        population = summary.population,
        "Evolution complete"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use multiverse_types::{Board, Cell};

    use super::*;
    use crate::error::ErrorKind;
    use crate::oracle::{LifeOracle, ScriptedOracle};

    fn board(cells: &[(i32, i32)]) -> Board {
        cells.iter().copied().map(Cell::from).collect()
    }

    #[test]
    fn blinker_evolves_and_records_history() {
        let mv = Multiverse::new();
        let horizontal = board(&[(0, 1), (1, 1), (2, 1)]);
        let vertical = board(&[(1, 0), (1, 1), (1, 2)]);
        mv.commit("blink", &horizontal).unwrap();

        let summary = evolve(&mv, "blink", &mut LifeOracle::new(), 4).unwrap();
        assert_eq!(summary.steps_run, 4);
        assert_eq!(summary.last_step, Some(4));
        assert_eq!(summary.population, 3);
        assert_eq!(summary.cells_added, 8);
        assert_eq!(summary.records_interned, 2);

        assert_eq!(
            mv.full_history("blink").unwrap().boards(),
            vec![
                horizontal.clone(),
                vertical.clone(),
                horizontal.clone(),
                vertical,
                horizontal
            ]
        );
    }

    #[test]
    fn zero_steps_is_noop() {
        let mv = Multiverse::new();
        mv.commit("T", &board(&[(0, 0)])).unwrap();
        let summary = evolve(&mv, "T", &mut LifeOracle::new(), 0).unwrap();
        assert_eq!(summary.steps_run, 0);
        assert_eq!(summary.last_step, None);
        assert_eq!(summary.population, 1);
        assert_eq!(mv.commit_count("T").unwrap(), 1);
    }

    #[test]
    fn oracle_failure_keeps_earlier_commits() {
        let mv = Multiverse::new();
        mv.create("T").unwrap();
        let mut oracle = ScriptedOracle::new([board(&[(1, 1)]), board(&[(2, 2)])]);
        let err = evolve(&mv, "T", &mut oracle, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Oracle);
        assert_eq!(mv.commit_count("T").unwrap(), 2);
        assert_eq!(mv.latest_board("T").unwrap(), board(&[(2, 2)]));
    }

    #[test]
    fn unknown_timeline_is_not_found() {
        let mv = Multiverse::new();
        let err = evolve(&mv, "missing", &mut LifeOracle::new(), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
