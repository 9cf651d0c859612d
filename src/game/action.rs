//! Discrete action space: one action per (playable square, diagonal direction).
//!
//! ```text
//! square = row * 4 + col / 2        (32 playable squares)
//! action = square * 4 + direction   (128 actions)
//! ```
//!
//! Whether an action is a step or a jump is decided by the position it is
//! played in: when any capture is available, every legal action is a jump.

use super::{Board, BOARD_SIZE, NUM_SQUARES};

pub const NUM_DIRECTIONS: usize = 4;
pub const NUM_ACTIONS: usize = NUM_SQUARES * NUM_DIRECTIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub const ALL: [Direction; NUM_DIRECTIONS] = [
        Direction::UpLeft,
        Direction::UpRight,
        Direction::DownLeft,
        Direction::DownRight,
    ];

    /// (row, col) offset of one diagonal step
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::UpLeft => (-1, -1),
            Direction::UpRight => (-1, 1),
            Direction::DownLeft => (1, -1),
            Direction::DownRight => (1, 1),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Direction::UpLeft => 0,
            Direction::UpRight => 1,
            Direction::DownLeft => 2,
            Direction::DownRight => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Direction> {
        Direction::ALL.get(index).copied()
    }
}

/// Index of a playable square, or None for the light squares.
pub fn square_index(row: usize, col: usize) -> Option<usize> {
    if Board::is_playable(row, col) {
        Some(row * (BOARD_SIZE / 2) + col / 2)
    } else {
        None
    }
}

/// Board coordinates of a playable square index.
pub fn square_coords(square: usize) -> (usize, usize) {
    let row = square / (BOARD_SIZE / 2);
    let offset = if row % 2 == 0 { 1 } else { 0 };
    let col = 2 * (square % (BOARD_SIZE / 2)) + offset;
    (row, col)
}

pub fn encode_action(square: usize, direction: Direction) -> usize {
    square * NUM_DIRECTIONS + direction.index()
}

/// Split an action into its square and direction. None when out of range.
pub fn decode_action(action: usize) -> Option<(usize, Direction)> {
    if action >= NUM_ACTIONS {
        return None;
    }
    let direction = Direction::from_index(action % NUM_DIRECTIONS)?;
    Some((action / NUM_DIRECTIONS, direction))
}

/// A fully resolved move, as produced for the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: (usize, usize),
    pub to: (usize, usize),
    pub direction: Direction,
    pub capture: bool,
}

impl Move {
    /// The action index this move was decoded from.
    pub fn action(&self) -> usize {
        let square = square_index(self.from.0, self.from.1)
            .expect("moves always start on a playable square");
        encode_action(square, self.direction)
    }

    /// Square jumped over, for captures.
    pub fn captured_square(&self) -> Option<(usize, usize)> {
        if !self.capture {
            return None;
        }
        Some(((self.from.0 + self.to.0) / 2, (self.from.1 + self.to.1) / 2))
    }
}
