//! Cells, boards, and content-addressed cell records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single live cell on the plane.
///
/// Cells have no identity beyond their coordinates. Ordering is by `x`,
/// then `y`, which gives boards a deterministic iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column coordinate.
    pub x: i32,
    /// Row coordinate.
    pub y: i32,
}

impl Cell {
    /// Create a cell at `(x, y)`.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The set of live cells at one instant.
pub type Board = BTreeSet<Cell>;

/// Content hash of a cell, derived deterministically from its coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellHash(pub u64);

impl CellHash {
    /// Return the raw hash value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }

    /// Reinterpret the hash bits as a signed integer (for `BIGINT` columns).
    pub const fn to_signed(self) -> i64 {
        i64::from_be_bytes(self.0.to_be_bytes())
    }

    /// Inverse of [`CellHash::to_signed`].
    pub const fn from_signed(raw: i64) -> Self {
        Self(u64::from_be_bytes(raw.to_be_bytes()))
    }
}

impl core::fmt::Display for CellHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Durable, content-addressed identity of a cell.
///
/// One record exists per distinct hash in a store. Every commit that
/// contains the cell refers to the record by hash instead of storing the
/// coordinates again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRecord {
    /// Content hash of `(x, y)`.
    pub hash: CellHash,
    /// Column coordinate.
    pub x: i32,
    /// Row coordinate.
    pub y: i32,
}

impl CellRecord {
    /// Return the cell this record identifies.
    pub const fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_order_by_x_then_y() {
        let board: Board = [Cell::new(2, 0), Cell::new(1, 5), Cell::new(1, -3)]
            .into_iter()
            .collect();
        let ordered: Vec<Cell> = board.into_iter().collect();
        assert_eq!(
            ordered,
            vec![Cell::new(1, -3), Cell::new(1, 5), Cell::new(2, 0)]
        );
    }

    #[test]
    fn board_ignores_duplicates() {
        let board: Board = [Cell::new(1, 1), Cell::from((1, 1))].into_iter().collect();
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn signed_hash_roundtrip() {
        for raw in [0_u64, 1, u64::MAX, 0x8000_0000_0000_0000] {
            let hash = CellHash(raw);
            assert_eq!(CellHash::from_signed(hash.to_signed()), hash);
        }
        assert_eq!(CellHash(u64::MAX).to_signed(), -1);
    }

    #[test]
    fn record_exposes_cell() {
        let record = CellRecord {
            hash: CellHash(7),
            x: -4,
            y: 9,
        };
        assert_eq!(record.cell(), Cell::new(-4, 9));
        assert_eq!(record.cell().to_string(), "(-4, 9)");
    }
}
