//! Training infrastructure: episode runner against an opponent, replay
//! buffer, rolling metrics and the trainer loop.

pub mod episode;
pub mod metrics;
pub mod replay_buffer;
pub mod trainer;

pub use episode::{evaluate, play_eval_game, play_training_episode, EpisodeTrace};
pub use metrics::{EpisodeResult, TrainingMetrics};
pub use replay_buffer::ReplayBuffer;
pub use trainer::{Trainer, TrainerConfig};
