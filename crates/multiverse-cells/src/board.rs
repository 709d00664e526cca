//! Strict board construction.
//!
//! [`Board`] is a set, so it cannot hold duplicates. Raw cell lists coming
//! from outside (oracle output, config files, imports) can, and a duplicate
//! there means the input is malformed rather than something to silently
//! fold away.

use multiverse_types::{Board, Cell};

use crate::error::CellError;

/// Build a board from a cell list, rejecting duplicate coordinates.
///
/// # Errors
///
/// Returns [`CellError::DuplicateCell`] for the first repeated cell.
pub fn board_from_cells(cells: &[Cell]) -> Result<Board, CellError> {
    let mut board = Board::new();
    for &cell in cells {
        if !board.insert(cell) {
            return Err(CellError::DuplicateCell(cell));
        }
    }
    Ok(board)
}

/// Parse ASCII rows into a board.
///
/// `#`, `O` and `*` are live cells; `.`, `_` and spaces are dead. Row `r`,
/// column `c` becomes the cell `(c, r)`.
///
/// # Errors
///
/// Returns [`CellError::InvalidPattern`] for any other character and
/// [`CellError::PatternTooLarge`] if a coordinate does not fit in `i32`.
pub fn parse_pattern<S: AsRef<str>>(rows: &[S]) -> Result<Board, CellError> {
    let mut board = Board::new();
    for (row, line) in rows.iter().enumerate() {
        for (column, ch) in line.as_ref().chars().enumerate() {
            match ch {
                '#' | 'O' | '*' => {
                    let x = i32::try_from(column).map_err(|_conv| CellError::PatternTooLarge)?;
                    let y = i32::try_from(row).map_err(|_conv| CellError::PatternTooLarge)?;
                    board.insert(Cell::new(x, y));
                }
                '.' | '_' | ' ' => {}
                found => {
                    return Err(CellError::InvalidPattern { row, column, found });
                }
            }
        }
    }
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cells_accepts_distinct() {
        let cells = [Cell::new(0, 0), Cell::new(0, 1), Cell::new(-2, 5)];
        let board = board_from_cells(&cells);
        assert_eq!(board.map(|b| b.len()), Ok(3));
    }

    #[test]
    fn from_cells_rejects_duplicate() {
        let cells = [Cell::new(1, 1), Cell::new(2, 2), Cell::new(1, 1)];
        assert_eq!(
            board_from_cells(&cells),
            Err(CellError::DuplicateCell(Cell::new(1, 1)))
        );
    }

    #[test]
    fn from_cells_empty_is_empty_board() {
        assert_eq!(board_from_cells(&[]), Ok(Board::new()));
    }

    #[test]
    fn parse_glider() {
        let board = parse_pattern(&[".#.", "..#", "###"]);
        let expected: Board = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]
            .into_iter()
            .map(Cell::from)
            .collect();
        assert_eq!(board, Ok(expected));
    }

    #[test]
    fn parse_rejects_unknown_character() {
        let result = parse_pattern(&["#.x"]);
        assert_eq!(
            result,
            Err(CellError::InvalidPattern {
                row: 0,
                column: 2,
                found: 'x'
            })
        );
    }

    #[test]
    fn parse_empty_rows() {
        let rows: [&str; 0] = [];
        assert_eq!(parse_pattern(&rows), Ok(Board::new()));
        assert_eq!(parse_pattern(&["...", "   "]), Ok(Board::new()));
    }
}
