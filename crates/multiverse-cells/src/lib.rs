//! Cell-set algebra and content hashing for Multiverse boards.
//!
//! Everything in this crate is pure: no storage, no clocks, no logging.
//! The timeline engine builds on these functions to compute minimal deltas
//! between consecutive boards and to address cells by content.
//!
//! # Modules
//!
//! - [`algebra`] -- [`diff`], [`modify`], [`normalize`], [`equal`],
//!   [`merge_boards`], [`translate`], and [`bounds`]
//! - [`hash`] -- The [`CellHasher`] trait and the collision-free
//!   [`ContentHasher`]
//! - [`board`] -- Strict construction from cell lists and ASCII patterns
//! - [`error`] -- [`CellError`]
//!
//! # Usage
//!
//! ```
//! use multiverse_cells::{diff, equal, translate};
//! use multiverse_types::{Board, Cell};
//!
//! let before: Board = [Cell::new(1, 1), Cell::new(2, 2)].into_iter().collect();
//! let after: Board = [Cell::new(2, 2), Cell::new(3, 3)].into_iter().collect();
//!
//! let delta = diff(&before, &after);
//! assert!(delta.added.contains(&Cell::new(3, 3)));
//! assert!(delta.removed.contains(&Cell::new(1, 1)));
//! assert!(translate(&before, 10, -4).is_some_and(|moved| equal(&before, &moved)));
//! ```

pub mod algebra;
pub mod board;
pub mod error;
pub mod hash;

// Re-export primary types at crate root.
pub use algebra::{
    BoardDiff, Bounds, bounds, diff, equal, merge_boards, modify, normalize, translate,
};
pub use board::{board_from_cells, parse_pattern};
pub use error::CellError;
pub use hash::{CellHasher, ContentHasher, hash_board};
