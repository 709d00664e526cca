//! Configured run: seed a timeline, evolve it, then fork and evolve the
//! configured branches.
//!
//! Branches are created in config order, so a branch may name an earlier
//! branch as its source. Each timeline gets a freshly built oracle, so a
//! seeded oracle produces the same sequence on every timeline it drives.

use multiverse_cells::{board_from_cells, parse_pattern};
use multiverse_core::config::{BranchConfig, RunConfig};
use multiverse_core::{EvolveSummary, Multiverse, build_oracle, evolve};
use tracing::info;

use crate::error::EngineError;

/// Outcome of a configured run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Summary of the run timeline's evolution.
    pub main: EvolveSummary,
    /// Summaries of each branch's evolution, in config order.
    pub branches: Vec<EvolveSummary>,
}

impl RunReport {
    /// Every timeline the run touched, run timeline first.
    pub fn timelines(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.main.timeline.as_str())
            .chain(self.branches.iter().map(|b| b.timeline.as_str()))
    }
}

/// Execute the configured run against `multiverse`.
///
/// # Errors
///
/// Returns [`EngineError::Board`] for a malformed pattern or branch cell
/// list, [`EngineError::Oracle`] if the oracle cannot be built, and
/// [`EngineError::Multiverse`] for any timeline failure.
pub fn run(multiverse: &Multiverse, config: &RunConfig) -> Result<RunReport, EngineError> {
    let seed = parse_pattern(&config.pattern)?;
    let step = multiverse.commit(&config.timeline, &seed)?;
    info!(
        timeline = %config.timeline,
        step,
        population = seed.len(),
        "Seeded timeline"
    );

    let mut oracle = build_oracle(&config.oracle)?;
    let main = evolve(multiverse, &config.timeline, oracle.as_mut(), config.steps)?;

    let mut branches = Vec::with_capacity(config.branches.len());
    for branch in &config.branches {
        branches.push(fork(multiverse, config, branch)?);
    }

    Ok(RunReport { main, branches })
}

fn fork(
    multiverse: &Multiverse,
    config: &RunConfig,
    branch: &BranchConfig,
) -> Result<EvolveSummary, EngineError> {
    let source = branch.source.as_deref().unwrap_or(&config.timeline);
    let add = board_from_cells(&branch.add)?;
    let remove = board_from_cells(&branch.remove)?;
    multiverse.branch_modified(source, branch.from, &add, &remove, &branch.name)?;

    let mut oracle = build_oracle(&config.oracle)?;
    Ok(evolve(multiverse, &branch.name, oracle.as_mut(), branch.steps)?)
}
