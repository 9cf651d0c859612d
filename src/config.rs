use std::path::Path;

use log::warn;

use crate::ai::DqnConfig;
use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::training::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dqn: DqnConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
}

fn ensure(ok: bool, msg: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Validation(msg.into()))
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dqn = &self.dqn;
        ensure(dqn.learning_rate > 0.0, "dqn.learning_rate must be > 0")?;
        ensure(
            (0.0..=1.0).contains(&dqn.gamma),
            "dqn.gamma must be in [0, 1]",
        )?;

        // Exploration schedule
        ensure(
            (0.0..=1.0).contains(&dqn.epsilon_start),
            "dqn.epsilon_start must be in [0, 1]",
        )?;
        ensure(
            (0.0..=1.0).contains(&dqn.epsilon_min),
            "dqn.epsilon_min must be in [0, 1]",
        )?;
        ensure(
            dqn.epsilon_min <= dqn.epsilon_start,
            "dqn.epsilon_min must be <= dqn.epsilon_start",
        )?;
        ensure(
            dqn.epsilon_decay > 0.0 && dqn.epsilon_decay <= 1.0,
            "dqn.epsilon_decay must be in (0, 1]",
        )?;

        // Replay
        ensure(dqn.batch_size > 0, "dqn.batch_size must be > 0")?;
        ensure(
            dqn.replay_capacity >= dqn.batch_size,
            "dqn.replay_capacity must be >= dqn.batch_size",
        )?;
        ensure(
            dqn.train_start >= dqn.batch_size,
            "dqn.train_start must be >= dqn.batch_size",
        )?;
        ensure(
            dqn.train_start <= dqn.replay_capacity,
            "dqn.train_start must be <= dqn.replay_capacity",
        )?;

        let training = &self.training;
        ensure(training.num_episodes > 0, "training.num_episodes must be > 0")?;
        ensure(
            training.target_update_interval > 0,
            "training.target_update_interval must be > 0",
        )?;
        ensure(training.log_interval > 0, "training.log_interval must be > 0")?;

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}
