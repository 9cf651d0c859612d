//! Checkers rules: board representation, the two sides, the discrete action
//! space, and a game state machine with immutable transitions.

mod action;
mod board;
mod piece;
mod state;

pub use action::{
    decode_action, encode_action, square_coords, square_index, Direction, Move, NUM_ACTIONS,
    NUM_DIRECTIONS,
};
pub use board::{Board, Cell, BOARD_SIZE, NUM_SQUARES};
pub use piece::Piece;
pub use state::{GameOutcome, GameState, MoveError, DRAW_PLY_LIMIT};
