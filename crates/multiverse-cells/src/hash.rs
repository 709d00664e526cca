//! Content addressing for cells.
//!
//! A [`CellHasher`] maps coordinates to a [`CellHash`]. The store keeps one
//! [`CellRecord`] per hash, so the hasher must be deterministic and must
//! not map two distinct cells to the same hash. The default
//! [`ContentHasher`] packs both `i32` coordinates into one `u64` and runs it
//! through the `splitmix64` finalizer. Both steps are bijections, so the
//! default hasher cannot collide anywhere on the plane.
//!
//! Other hashers may be injected. Collisions they produce are detected when
//! a commit is planned and when the store interns a record.

use std::collections::BTreeMap;

use multiverse_types::{Board, Cell, CellHash, CellRecord};

use crate::error::CellError;

/// Deterministic cell-to-hash function.
pub trait CellHasher: Send + Sync + core::fmt::Debug {
    /// Hash a single cell.
    fn hash_cell(&self, cell: Cell) -> CellHash;

    /// Build the content-addressed record for a cell.
    fn record(&self, cell: Cell) -> CellRecord {
        CellRecord {
            hash: self.hash_cell(cell),
            x: cell.x,
            y: cell.y,
        }
    }
}

/// The default, collision-free hasher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentHasher;

impl ContentHasher {
    /// Create the default hasher.
    pub const fn new() -> Self {
        Self
    }
}

/// Reinterpret an `i32` as the `u32` with the same bits.
fn bits(value: i32) -> u64 {
    u64::from(u32::from_be_bytes(value.to_be_bytes()))
}

/// `splitmix64` output function; a bijection on `u64`.
const fn mix(mut z: u64) -> u64 {
    z = (z ^ z.wrapping_shr(30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ z.wrapping_shr(27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ z.wrapping_shr(31)
}

impl CellHasher for ContentHasher {
    fn hash_cell(&self, cell: Cell) -> CellHash {
        CellHash(mix(bits(cell.x).wrapping_shl(32) | bits(cell.y)))
    }
}

/// Hash every cell of a board, failing if two distinct cells collide.
///
/// # Errors
///
/// Returns [`CellError::HashCollision`] naming the first colliding pair.
pub fn hash_board(
    hasher: &dyn CellHasher,
    board: &Board,
) -> Result<BTreeMap<CellHash, CellRecord>, CellError> {
    let mut records: BTreeMap<CellHash, CellRecord> = BTreeMap::new();
    for &cell in board {
        let record = hasher.record(cell);
        if let Some(existing) = records.get(&record.hash) {
            return Err(CellError::HashCollision {
                hash: record.hash,
                first: existing.cell(),
                second: cell,
            });
        }
        records.insert(record.hash, record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    /// Deliberately weak hasher: only looks at `x`.
    #[derive(Debug)]
    struct ColumnHasher;

    impl CellHasher for ColumnHasher {
        fn hash_cell(&self, cell: Cell) -> CellHash {
            CellHash(bits(cell.x))
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let h = ContentHasher::new();
        let cell = Cell::new(12, -7);
        assert_eq!(h.hash_cell(cell), h.hash_cell(cell));
        assert_eq!(h.record(cell).cell(), cell);
    }

    #[test]
    fn no_collisions_over_dense_grid() {
        let h = ContentHasher::new();
        let mut seen = BTreeSet::new();
        for x in -64..64 {
            for y in -64..64 {
                assert!(seen.insert(h.hash_cell(Cell::new(x, y))));
            }
        }
    }

    #[test]
    fn extremes_are_distinct() {
        let h = ContentHasher::new();
        let corners = [
            Cell::new(i32::MIN, i32::MIN),
            Cell::new(i32::MIN, i32::MAX),
            Cell::new(i32::MAX, i32::MIN),
            Cell::new(i32::MAX, i32::MAX),
            Cell::new(0, 0),
            Cell::new(0, -1),
            Cell::new(-1, 0),
        ];
        let hashes: BTreeSet<CellHash> = corners.iter().map(|&c| h.hash_cell(c)).collect();
        assert_eq!(hashes.len(), corners.len());
    }

    #[test]
    fn transposed_cells_hash_differently() {
        let h = ContentHasher::new();
        assert_ne!(h.hash_cell(Cell::new(1, 2)), h.hash_cell(Cell::new(2, 1)));
    }

    #[test]
    fn hash_board_detects_collision() {
        let board: Board = [Cell::new(3, 1), Cell::new(3, 2)].into_iter().collect();
        let result = hash_board(&ColumnHasher, &board);
        assert!(matches!(
            result,
            Err(CellError::HashCollision { first, second, .. })
                if first == Cell::new(3, 1) && second == Cell::new(3, 2)
        ));
    }

    #[test]
    fn hash_board_indexes_every_cell() {
        let board: Board = [Cell::new(0, 0), Cell::new(5, 5)].into_iter().collect();
        let records = hash_board(&ContentHasher, &board).unwrap_or_default();
        assert_eq!(records.len(), 2);
        let cells: Board = records.values().map(CellRecord::cell).collect();
        assert_eq!(cells, board);
    }
}
