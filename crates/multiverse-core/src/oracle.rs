//! Board oracles.
//!
//! The timeline engine never decides how a board evolves. It asks a
//! [`BoardOracle`] for the next raw board and commits whatever comes back.
//! The oracle could be a cellular-automaton rule, a scripted sequence, a
//! seeded random walk, or a human.
//!
//! Three deterministic implementations ship here:
//!
//! - [`LifeOracle`] -- Conway's Game of Life on an unbounded plane.
//! - [`MutationOracle`] -- toggles cells near the live region using a
//!   seeded [`StdRng`], so runs replay exactly for a given seed.
//! - [`ScriptedOracle`] -- returns a fixed list of boards in order.

use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use multiverse_types::{Board, Cell};

use crate::config::{OracleConfig, OracleKind};

/// Errors that can occur while producing the next board.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    /// A scripted oracle ran out of boards.
    #[error("oracle exhausted at step {step}")]
    Exhausted {
        /// The step that was requested.
        step: u64,
    },

    /// A probability parameter was outside `[0, 1]`.
    #[error("probability must be within [0, 1], got {value}")]
    InvalidProbability {
        /// The rejected value.
        value: f64,
    },

    /// An internal error in the oracle.
    #[error("oracle error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// A source of successive boards.
pub trait BoardOracle {
    /// Produce the raw board that follows `board`.
    ///
    /// `step` is the step the returned board will be committed as.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] if no board can be produced.
    fn next_board(&mut self, step: u64, board: &Board) -> Result<Board, OracleError>;
}

/// Build the oracle described by a config section.
///
/// # Errors
///
/// Returns [`OracleError::InvalidProbability`] for an out-of-range flip
/// probability.
pub fn build_oracle(config: &OracleConfig) -> Result<Box<dyn BoardOracle + Send>, OracleError> {
    Ok(match config.kind {
        OracleKind::Life => Box::new(LifeOracle::new()),
        OracleKind::Mutation => Box::new(MutationOracle::new(
            config.seed,
            config.flip_probability,
        )?),
    })
}

/// The eight neighbours of a cell, skipping any that would leave the
/// coordinate range.
fn neighbours(cell: Cell) -> impl Iterator<Item = Cell> {
    [-1_i32, 0, 1].into_iter().flat_map(move |dx| {
        [-1_i32, 0, 1].into_iter().filter_map(move |dy| {
            if dx == 0 && dy == 0 {
                return None;
            }
            Some(Cell::new(cell.x.checked_add(dx)?, cell.y.checked_add(dy)?))
        })
    })
}

/// Conway's Game of Life, rule B3/S23.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifeOracle;

impl LifeOracle {
    /// Create a Life oracle.
    pub const fn new() -> Self {
        Self
    }

    /// Compute one generation.
    pub fn step(board: &Board) -> Board {
        let mut counts: BTreeMap<Cell, u8> = BTreeMap::new();
        for &cell in board {
            for neighbour in neighbours(cell) {
                let count = counts.entry(neighbour).or_insert(0);
                *count = count.saturating_add(1);
            }
        }
        counts
            .into_iter()
            .filter(|&(cell, count)| count == 3 || (count == 2 && board.contains(&cell)))
            .map(|(cell, _)| cell)
            .collect()
    }
}

impl BoardOracle for LifeOracle {
    fn next_board(&mut self, _step: u64, board: &Board) -> Result<Board, OracleError> {
        Ok(Self::step(board))
    }
}

/// Seeded random toggling of cells in and around the live region.
///
/// Each call considers every live cell and its neighbours (or the origin
/// neighbourhood when the board is empty) in sorted order, and flips each
/// with `flip_probability`.
#[derive(Debug, Clone)]
pub struct MutationOracle {
    rng: StdRng,
    flip_probability: f64,
}

impl MutationOracle {
    /// Create a mutation oracle.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::InvalidProbability`] unless
    /// `0 <= flip_probability <= 1`.
    pub fn new(seed: u64, flip_probability: f64) -> Result<Self, OracleError> {
        if !(0.0..=1.0).contains(&flip_probability) {
            return Err(OracleError::InvalidProbability {
                value: flip_probability,
            });
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            flip_probability,
        })
    }
}

impl BoardOracle for MutationOracle {
    fn next_board(&mut self, _step: u64, board: &Board) -> Result<Board, OracleError> {
        let mut candidates = Board::new();
        if board.is_empty() {
            let origin = Cell::new(0, 0);
            candidates.insert(origin);
            candidates.extend(neighbours(origin));
        }
        for &cell in board {
            candidates.insert(cell);
            candidates.extend(neighbours(cell));
        }

        let mut next = board.clone();
        for cell in candidates {
            if self.rng.random_bool(self.flip_probability) && !next.remove(&cell) {
                next.insert(cell);
            }
        }
        Ok(next)
    }
}

/// Replays a fixed list of boards, ignoring the input board.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    boards: VecDeque<Board>,
}

impl ScriptedOracle {
    /// Create an oracle that yields `boards` in order.
    pub fn new<I: IntoIterator<Item = Board>>(boards: I) -> Self {
        Self {
            boards: boards.into_iter().collect(),
        }
    }

    /// Number of boards left.
    pub fn remaining(&self) -> usize {
        self.boards.len()
    }
}

impl BoardOracle for ScriptedOracle {
    fn next_board(&mut self, step: u64, _board: &Board) -> Result<Board, OracleError> {
        self.boards
            .pop_front()
            .ok_or(OracleError::Exhausted { step })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn board(cells: &[(i32, i32)]) -> Board {
        cells.iter().copied().map(Cell::from).collect()
    }

    #[test]
    fn neighbours_skip_overflow() {
        assert_eq!(neighbours(Cell::new(0, 0)).count(), 8);
        assert_eq!(neighbours(Cell::new(i32::MAX, i32::MAX)).count(), 3);
    }

    #[test]
    fn blinker_oscillates() {
        let horizontal = board(&[(0, 1), (1, 1), (2, 1)]);
        let vertical = board(&[(1, 0), (1, 1), (1, 2)]);
        assert_eq!(LifeOracle::step(&horizontal), vertical);
        assert_eq!(LifeOracle::step(&vertical), horizontal);
    }

    #[test]
    fn block_is_still_life() {
        let block = board(&[(0, 0), (0, 1), (1, 0), (1, 1)]);
        let mut oracle = LifeOracle::new();
        assert_eq!(oracle.next_board(1, &block).unwrap(), block);
    }

    #[test]
    fn lone_cell_dies() {
        assert!(LifeOracle::step(&board(&[(5, 5)])).is_empty());
        assert!(LifeOracle::step(&Board::new()).is_empty());
    }

    #[test]
    fn glider_translates_after_four_generations() {
        let glider = board(&[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
        let mut current = glider.clone();
        for _ in 0..4 {
            current = LifeOracle::step(&current);
        }
        let moved: Board = glider
            .iter()
            .map(|c| Cell::new(c.x.saturating_add(1), c.y.saturating_add(1)))
            .collect();
        assert_eq!(current, moved);
    }

    #[test]
    fn mutation_is_deterministic_per_seed() {
        let start = board(&[(0, 0), (1, 0), (2, 0)]);
        let mut a = MutationOracle::new(7, 0.3).unwrap();
        let mut b = MutationOracle::new(7, 0.3).unwrap();
        for step in 1..5 {
            assert_eq!(
                a.next_board(step, &start).unwrap(),
                b.next_board(step, &start).unwrap()
            );
        }
    }

    #[test]
    fn mutation_extremes() {
        let start = board(&[(0, 0)]);
        let mut never = MutationOracle::new(1, 0.0).unwrap();
        assert_eq!(never.next_board(1, &start).unwrap(), start);

        let mut always = MutationOracle::new(1, 1.0).unwrap();
        let flipped = always.next_board(1, &start).unwrap();
        assert!(!flipped.contains(&Cell::new(0, 0)));
        assert_eq!(flipped.len(), 8);
    }

    #[test]
    fn mutation_rejects_bad_probability() {
        assert!(MutationOracle::new(1, 1.5).is_err());
        assert!(MutationOracle::new(1, -0.1).is_err());
        assert!(MutationOracle::new(1, f64::NAN).is_err());
    }

    #[test]
    fn scripted_yields_in_order_then_exhausts() {
        let first = board(&[(1, 1)]);
        let second = board(&[(2, 2)]);
        let mut oracle = ScriptedOracle::new([first.clone(), second.clone()]);
        assert_eq!(oracle.remaining(), 2);
        assert_eq!(oracle.next_board(1, &Board::new()).unwrap(), first);
        assert_eq!(oracle.next_board(2, &first).unwrap(), second);
        assert_eq!(
            oracle.next_board(3, &second),
            Err(OracleError::Exhausted { step: 3 })
        );
    }

    #[test]
    fn build_from_config() {
        let life = build_oracle(&OracleConfig::default());
        assert!(life.is_ok());

        let bad = OracleConfig {
            kind: OracleKind::Mutation,
            flip_probability: 2.0,
            ..OracleConfig::default()
        };
        assert!(build_oracle(&bad).is_err());
    }
}
