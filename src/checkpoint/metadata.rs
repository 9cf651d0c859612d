use serde::{Deserialize, Serialize};

use crate::ai::DqnConfig;
use crate::game::Piece;

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub win_rate: f32,
    pub draw_rate: f32,
    pub average_game_length: f32,
    pub current_loss: f32,
    pub training_steps: usize,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub agent: String,
    pub piece: Piece,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: DqnConfig,
}

/// Mutable training state written to training_state.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnTrainingState {
    pub epsilon: f32,
    pub step_count: usize,
    pub episode_count: usize,
}
