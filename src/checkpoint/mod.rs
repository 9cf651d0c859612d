//! Model persistence: network weights, training state, and metadata written
//! to versioned checkpoint directories.

mod manager;
mod metadata;

pub use manager::{CheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{CheckpointMetadata, CheckpointMetrics, DqnTrainingState};
