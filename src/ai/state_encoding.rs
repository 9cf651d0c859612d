use burn::prelude::*;
use burn::tensor::TensorData;

use crate::game::{GameState, Piece, BOARD_SIZE};

pub const BOARD_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// Encode a game state as a tensor of shape [1, 8, 8].
///
/// Dark pieces (men and kings) are +1.0, light pieces are -1.0, empty
/// squares are 0.0. The encoding is absolute, not relative to the side
/// to move.
pub fn encode_state<B: Backend>(state: &GameState, device: &B::Device) -> Tensor<B, 3> {
    let data = encode_state_flat(state);
    Tensor::<B, 1>::from_data(TensorData::from(data.as_slice()), device).reshape([
        1,
        BOARD_SIZE as i32,
        BOARD_SIZE as i32,
    ])
}

/// Encode multiple game states as a batched tensor of shape [batch, 1, 8, 8].
pub fn encode_states_batch<B: Backend>(states: &[GameState], device: &B::Device) -> Tensor<B, 4> {
    let batch_size = states.len();
    let mut flat = Vec::with_capacity(batch_size * BOARD_CELLS);
    for state in states {
        flat.extend_from_slice(&encode_state_flat(state));
    }
    Tensor::<B, 1>::from_data(TensorData::from(flat.as_slice()), device).reshape([
        batch_size as i32,
        1,
        BOARD_SIZE as i32,
        BOARD_SIZE as i32,
    ])
}

/// Produce the flat [64] f32 array for a single state encoding.
pub fn encode_state_flat(state: &GameState) -> [f32; BOARD_CELLS] {
    let mut data = [0.0f32; BOARD_CELLS];
    let board = state.board();
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            data[row * BOARD_SIZE + col] = match board.get(row, col).piece() {
                Some(Piece::Dark) => 1.0,
                Some(Piece::Light) => -1.0,
                None => 0.0,
            };
        }
    }
    data
}
