//! Pure set operations on boards.
//!
//! Nothing here touches storage. Every function takes boards by reference
//! and returns a fresh board, so callers can diff or combine the state of
//! two timelines without mutating either.
//!
//! # Equality
//!
//! Two notions of equality are in play. `a == b` is literal set equality.
//! [`equal`] is shape equality: the boards match after both are
//! [`normalize`]d, so a glider one cell to the left is still "the same".

use serde::{Deserialize, Serialize};

use multiverse_types::{Board, Cell};

/// The three-way split between two boards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDiff {
    /// Cells in the new board only.
    pub added: Board,
    /// Cells in the old board only.
    pub removed: Board,
    /// Cells in both boards.
    pub unchanged: Board,
}

impl BoardDiff {
    /// Return whether the two boards were identical.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Number of cells that changed state.
    pub fn changed(&self) -> usize {
        self.added.len().saturating_add(self.removed.len())
    }
}

/// Inclusive bounding box of a non-empty board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest `x` and smallest `y` (not necessarily a live cell).
    pub min: Cell,
    /// Largest `x` and largest `y` (not necessarily a live cell).
    pub max: Cell,
}

/// Split `old -> new` into added, removed, and unchanged cells.
///
/// `added` and `removed` are disjoint by construction.
pub fn diff(old: &Board, new: &Board) -> BoardDiff {
    BoardDiff {
        added: new.difference(old).copied().collect(),
        removed: old.difference(new).copied().collect(),
        unchanged: old.intersection(new).copied().collect(),
    }
}

/// Compute `(board - remove) + add`.
///
/// A cell listed in both `add` and `remove` ends up alive.
pub fn modify(board: &Board, add: &Board, remove: &Board) -> Board {
    board
        .difference(remove)
        .chain(add.iter())
        .copied()
        .collect()
}

/// Union of two boards.
pub fn merge_boards(a: &Board, b: &Board) -> Board {
    a.union(b).copied().collect()
}

/// Return the bounding box, or `None` for an empty board.
pub fn bounds(board: &Board) -> Option<Bounds> {
    let first = board.first()?;
    let (mut min_y, mut max_y) = (first.y, first.y);
    for cell in board {
        min_y = min_y.min(cell.y);
        max_y = max_y.max(cell.y);
    }
    // Cells are ordered by x first, so the extremes of x are the ends.
    let last = board.last()?;
    Some(Bounds {
        min: Cell::new(first.x, min_y),
        max: Cell::new(last.x, max_y),
    })
}

/// Shift every cell by `(dx, dy)`.
///
/// Returns `None` if any shifted cell falls outside the `i32` range.
pub fn translate(board: &Board, dx: i32, dy: i32) -> Option<Board> {
    board
        .iter()
        .map(|cell| Some(Cell::new(cell.x.checked_add(dx)?, cell.y.checked_add(dy)?)))
        .collect()
}

/// Translate so that the minimum `x` and minimum `y` both become 0.
///
/// The empty board normalizes to itself. A board spanning more than
/// `i32::MAX` on either axis has offsets no [`Cell`] can hold, and yields
/// `None`.
pub fn normalize(board: &Board) -> Option<Board> {
    let Some(b) = bounds(board) else {
        return Some(Board::new());
    };
    board
        .iter()
        .map(|cell| {
            Some(Cell::new(
                cell.x.checked_sub(b.min.x)?,
                cell.y.checked_sub(b.min.y)?,
            ))
        })
        .collect()
}

/// Shape equality: `b` is `a` shifted by a single offset.
///
/// Agrees with comparing [`normalize`]d boards, and also decides boards too
/// wide to normalize. Offsets are computed in `i64`.
pub fn equal(a: &Board, b: &Board) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let (Some(from), Some(to)) = (bounds(a), bounds(b)) else {
        return true;
    };
    // Coordinate differences of two i32 values always fit in i64.
    let dx = i64::from(to.min.x).wrapping_sub(i64::from(from.min.x));
    let dy = i64::from(to.min.y).wrapping_sub(i64::from(from.min.y));
    a.iter().all(|cell| {
        let x = i32::try_from(i64::from(cell.x).wrapping_add(dx));
        let y = i32::try_from(i64::from(cell.y).wrapping_add(dy));
        matches!((x, y), (Ok(x), Ok(y)) if b.contains(&Cell::new(x, y)))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn board(cells: &[(i32, i32)]) -> Board {
        cells.iter().copied().map(Cell::from).collect()
    }

    fn samples() -> Vec<Board> {
        vec![
            Board::new(),
            board(&[(0, 0)]),
            board(&[(1, 1), (2, 2)]),
            board(&[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]),
            board(&[(-5, 3), (7, -2), (0, 0), (i32::MAX, i32::MIN)]),
        ]
    }

    #[test]
    fn diff_with_self_is_unchanged() {
        for a in samples() {
            let d = diff(&a, &a);
            assert!(d.added.is_empty());
            assert!(d.removed.is_empty());
            assert_eq!(d.unchanged, a);
            assert!(d.is_empty());
        }
    }

    #[test]
    fn diff_from_empty_is_all_added() {
        for a in samples() {
            let d = diff(&Board::new(), &a);
            assert_eq!(d.added, a);
            assert!(d.removed.is_empty());
            assert!(d.unchanged.is_empty());
        }
    }

    #[test]
    fn diff_splits_two_steps() {
        let step0 = board(&[(1, 1), (2, 2)]);
        let step1 = board(&[(2, 2), (3, 3)]);
        let d = diff(&step0, &step1);
        assert_eq!(d.added, board(&[(3, 3)]));
        assert_eq!(d.removed, board(&[(1, 1)]));
        assert_eq!(d.unchanged, board(&[(2, 2)]));
        assert_eq!(d.changed(), 2);
    }

    #[test]
    fn diff_parts_are_disjoint_and_rebuild_new() {
        let old = board(&[(0, 0), (1, 0), (2, 0)]);
        let new = board(&[(1, -1), (1, 0), (1, 1)]);
        let d = diff(&old, &new);
        assert!(d.added.is_disjoint(&d.removed));
        assert_eq!(modify(&old, &d.added, &d.removed), new);
    }

    #[test]
    fn modify_is_idempotent() {
        let add = board(&[(1, 1), (9, 9)]);
        let remove = board(&[(1, 1), (2, 2), (0, 0)]);
        for a in samples() {
            let once = modify(&a, &add, &remove);
            let twice = modify(&once, &add, &remove);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn modify_stays_within_board_and_additions() {
        let add = board(&[(4, 4)]);
        let remove = board(&[(2, 2)]);
        for a in samples() {
            let result = modify(&a, &add, &remove);
            let ceiling = merge_boards(&a, &add);
            assert!(result.is_subset(&ceiling));
        }
    }

    #[test]
    fn modify_addition_wins_over_removal() {
        let a = board(&[(1, 1)]);
        let both = board(&[(1, 1)]);
        assert_eq!(modify(&a, &both, &both), board(&[(1, 1)]));
        assert_eq!(modify(&Board::new(), &both, &both), board(&[(1, 1)]));
    }

    #[test]
    fn merge_is_symmetric_idempotent_associative() {
        let s = samples();
        for a in &s {
            assert_eq!(merge_boards(a, a), *a);
            for b in &s {
                assert_eq!(merge_boards(a, b), merge_boards(b, a));
                for c in &s {
                    assert_eq!(
                        merge_boards(&merge_boards(a, b), c),
                        merge_boards(a, &merge_boards(b, c))
                    );
                }
            }
        }
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert_eq!(normalize(&Board::new()), Some(Board::new()));
        assert!(bounds(&Board::new()).is_none());
    }

    #[test]
    fn normalize_moves_minimum_to_origin() {
        let b = board(&[(3, 7), (5, 4), (4, 9)]);
        let n = normalize(&b).unwrap();
        assert_eq!(n, board(&[(0, 3), (2, 0), (1, 5)]));
        let nb = bounds(&n);
        assert_eq!(nb.map(|x| x.min), Some(Cell::new(0, 0)));
    }

    #[test]
    fn normalize_is_deterministic_and_stable() {
        for a in samples() {
            if let Some(n) = normalize(&a) {
                assert_eq!(normalize(&n), Some(n.clone()));
                assert!(equal(&a, &n));
            }
        }
    }

    #[test]
    fn equal_is_translation_invariant() {
        let glider = board(&[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
        for (dx, dy) in [(0, 0), (5, -3), (-100, 42), (1_000_000, 1_000_000)] {
            assert!(equal(&glider, &translate(&glider, dx, dy).unwrap()));
        }
    }

    #[test]
    fn translate_out_of_range_is_none() {
        let pair = board(&[(0, 0), (1, 0)]);
        assert_eq!(translate(&pair, i32::MAX, 0), None);
        assert_eq!(
            translate(&pair, 0, i32::MIN),
            Some(board(&[(0, i32::MIN), (1, i32::MIN)]))
        );

        let moved = translate(&pair, 2_147_483_646, 0).unwrap();
        assert_eq!(moved, board(&[(2_147_483_646, 0), (i32::MAX, 0)]));
        assert!(equal(&pair, &moved));
    }

    #[test]
    fn wide_boards_keep_every_cell() {
        let wide = board(&[(i32::MIN, 0), (i32::MAX, 0), (2_147_483_646, 0)]);
        assert_eq!(normalize(&wide), None);
        assert!(equal(&wide, &wide));

        let other = board(&[(i32::MIN, 0), (i32::MAX, 0), (2_147_483_642, 0)]);
        assert!(!equal(&wide, &other));

        let left = board(&[(i32::MIN, 7), (2_147_483_646, 7)]);
        let right = board(&[(-2_147_483_647, -7), (i32::MAX, -7)]);
        assert!(equal(&left, &right));
        assert!(!equal(&left, &board(&[(i32::MIN, 7), (i32::MAX, 7)])));
    }

    #[test]
    fn equal_differs_from_set_equality() {
        let a = board(&[(0, 0), (1, 1)]);
        let b = board(&[(10, 10), (11, 11)]);
        assert_ne!(a, b);
        assert!(equal(&a, &b));
        assert!(!equal(&a, &board(&[(0, 0), (1, 0)])));
        assert!(equal(&Board::new(), &Board::new()));
    }

    #[test]
    fn bounds_covers_all_cells() {
        let b = board(&[(2, 9), (-1, 4), (7, -3)]);
        let bb = bounds(&b);
        assert_eq!(bb.map(|x| x.min), Some(Cell::new(-1, -3)));
        assert_eq!(bb.map(|x| x.max), Some(Cell::new(7, 9)));
    }

    #[test]
    fn diff_serializes() {
        let d = diff(&board(&[(0, 0)]), &board(&[(1, 1)]));
        let json = serde_json::to_string(&d).unwrap_or_default();
        assert!(json.contains("\"added\""));
    }
}
