use std::path::PathBuf;

/// Errors raised by the replay buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("cannot sample {requested} transitions from a buffer holding {available}")]
    Underflow { requested: usize, available: usize },
}

/// Errors raised while constructing or training the agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("invalid piece type {0} (expected 0 for dark or 1 for light)")]
    InvalidPieceType(u8),

    #[error("invalid agent config: {0}")]
    InvalidConfig(String),

    #[error("replay buffer error: {0}")]
    Replay(#[from] ReplayError),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("failed to save model: {0}")]
    ModelSave(String),
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("agent selected illegal action {action} (legal: {legal:?})")]
    IllegalAction { action: usize, legal: Vec<usize> },

    #[error("game should be terminal but has no outcome")]
    MissingOutcome,

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
