use super::Piece;

pub const BOARD_SIZE: usize = 8;
pub const NUM_SQUARES: usize = 32;

/// Rows each side fills at the start of a game.
const STARTING_ROWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Man(Piece),
    King(Piece),
}

impl Cell {
    /// Owner of the piece on this cell, if any
    pub fn piece(self) -> Option<Piece> {
        match self {
            Cell::Empty => None,
            Cell::Man(p) | Cell::King(p) => Some(p),
        }
    }

    pub fn is_king(self) -> bool {
        matches!(self, Cell::King(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Board {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Standard opening position: dark on rows 0-2, light on rows 5-7
    pub fn initial() -> Self {
        let mut board = Board::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if !Board::is_playable(row, col) {
                    continue;
                }
                if row < STARTING_ROWS {
                    board.cells[row][col] = Cell::Man(Piece::Dark);
                } else if row >= BOARD_SIZE - STARTING_ROWS {
                    board.cells[row][col] = Cell::Man(Piece::Light);
                }
            }
        }
        board
    }

    /// Get the cell at a specific position
    /// Row 0 is the top (dark's home row), row 7 is the bottom
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }

    /// Only the dark squares are used in checkers
    pub fn is_playable(row: usize, col: usize) -> bool {
        row < BOARD_SIZE && col < BOARD_SIZE && (row + col) % 2 == 1
    }

    pub fn in_bounds(row: i32, col: i32) -> bool {
        row >= 0 && row < BOARD_SIZE as i32 && col >= 0 && col < BOARD_SIZE as i32
    }

    /// Number of men and kings a side has left
    pub fn count(&self, piece: Piece) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.piece() == Some(piece))
            .count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                assert_eq!(board.get(row, col), Cell::Empty);
            }
        }
    }

    #[test]
    fn test_initial_board_piece_counts() {
        let board = Board::initial();
        assert_eq!(board.count(Piece::Dark), 12);
        assert_eq!(board.count(Piece::Light), 12);
    }

    #[test]
    fn test_initial_board_uses_playable_squares_only() {
        let board = Board::initial();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if !Board::is_playable(row, col) {
                    assert_eq!(board.get(row, col), Cell::Empty);
                }
            }
        }
        assert_eq!(board.get(0, 1), Cell::Man(Piece::Dark));
        assert_eq!(board.get(7, 0), Cell::Man(Piece::Light));
        assert_eq!(board.get(3, 0), Cell::Empty);
    }

    #[test]
    fn test_cell_accessors() {
        assert_eq!(Cell::Empty.piece(), None);
        assert_eq!(Cell::Man(Piece::Light).piece(), Some(Piece::Light));
        assert!(Cell::King(Piece::Dark).is_king());
        assert!(!Cell::Man(Piece::Dark).is_king());
    }

    #[test]
    fn test_in_bounds() {
        assert!(Board::in_bounds(0, 0));
        assert!(Board::in_bounds(7, 7));
        assert!(!Board::in_bounds(-1, 3));
        assert!(!Board::in_bounds(3, 8));
    }
}
