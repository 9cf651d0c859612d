use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::ai::{Agent, DqnAgent};
use crate::checkpoint::metadata::{CheckpointMetadata, CheckpointMetrics, DqnTrainingState};
use crate::error::CheckpointError;

const METADATA_FILE: &str = "metadata.json";
const TRAINING_STATE_FILE: &str = "training_state.json";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// Everything read back from one checkpoint directory.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub training_state: DqnTrainingState,
}

impl CheckpointData {
    /// Load the saved networks and training state into `agent`.
    pub fn restore(&self, agent: &mut DqnAgent) -> Result<(), CheckpointError> {
        agent
            .load_from_dir(&self.path)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        agent.restore_training_state(&self.training_state);
        Ok(())
    }
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        fs::create_dir_all(&config.checkpoint_dir).ok();
        CheckpointManager { config }
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Save weights, training state, and metadata under `checkpoint_{episode}`.
    /// The directory is written under a `.tmp` name and renamed when complete.
    pub fn save_checkpoint(
        &self,
        agent: &DqnAgent,
        metrics: &CheckpointMetrics,
        episode: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", episode);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        if let Err(e) = write_checkpoint_files(agent, metrics, episode, &tmp_dir) {
            fs::remove_dir_all(&tmp_dir).ok();
            return Err(e);
        }

        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&dir_name)?;
        self.prune_old_checkpoints()?;

        Ok(final_dir)
    }

    /// Read metadata and training state from a checkpoint directory.
    pub fn load_checkpoint(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }
        let metadata: CheckpointMetadata = read_json(&dir.join(METADATA_FILE))?;
        let training_state: DqnTrainingState = read_json(&dir.join(TRAINING_STATE_FILE))?;

        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
            training_state,
        })
    }

    /// Load the checkpoint the `latest` symlink points at.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join("latest");
        if !latest_link.exists() {
            return Err(CheckpointError::NoLatestSymlink(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let resolved = fs::read_link(&latest_link)?;
        let target = if resolved.is_relative() {
            self.config.checkpoint_dir.join(resolved)
        } else {
            resolved
        };
        self.load_checkpoint(&target)
    }

    /// List all checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(
        &self,
    ) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || path.is_symlink() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join(METADATA_FILE);
            if meta_path.exists() {
                let metadata: CheckpointMetadata = read_json(&meta_path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.episode);
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and best N by win_rate.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_win_rate: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.win_rate))
            .collect();
        by_win_rate.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        for (i, _) in by_win_rate.iter().take(self.config.keep_best_n) {
            keep.insert(*i);
        }

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                debug!("pruning checkpoint {}", path.display());
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }

    /// Update the `latest` symlink to point to the given checkpoint directory name.
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join("latest");
        if link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}

/// Write weights, training state, and metadata into `dir`.
fn write_checkpoint_files(
    agent: &DqnAgent,
    metrics: &CheckpointMetrics,
    episode: usize,
    dir: &Path,
) -> Result<(), CheckpointError> {
    fs::create_dir_all(dir)?;

    agent
        .save_to_dir(dir)
        .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;

    let state_json = serde_json::to_string_pretty(&agent.training_state())?;
    fs::write(dir.join(TRAINING_STATE_FILE), state_json)?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let metadata = CheckpointMetadata {
        episode,
        timestamp,
        agent: agent.name().to_string(),
        piece: agent.piece(),
        metrics: metrics.clone(),
        hyperparameters: agent.config().clone(),
    };
    let meta_json = serde_json::to_string_pretty(&metadata)?;
    fs::write(dir.join(METADATA_FILE), meta_json)?;

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CheckpointError> {
    let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::DqnConfig;
    use crate::game::{GameState, Piece};

    fn test_metrics() -> CheckpointMetrics {
        CheckpointMetrics {
            win_rate: 0.65,
            draw_rate: 0.10,
            average_game_length: 40.0,
            current_loss: 0.05,
            training_steps: 1000,
        }
    }

    fn test_agent() -> DqnAgent {
        DqnAgent::new(
            Piece::Dark,
            DqnConfig {
                seed: Some(5),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn manager_in(dir: &Path, keep_last_n: usize, keep_best_n: usize) -> CheckpointManager {
        CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.to_path_buf(),
            keep_last_n,
            keep_best_n,
        })
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        let mut agent = test_agent();
        agent.set_epsilon(0.3);
        agent.finish_episode();

        let path = manager.save_checkpoint(&agent, &test_metrics(), 1000).unwrap();
        assert!(path.exists());
        assert!(path.join("metadata.json").exists());
        assert!(path.join("training_state.json").exists());
        assert!(path.join("q_network.mpk").exists());
        assert!(path.join("target_network.mpk").exists());

        let data = manager.load_checkpoint(&path).unwrap();
        assert_eq!(data.metadata.episode, 1000);
        assert_eq!(data.metadata.agent, "DqnAgentDark");
        assert_eq!(data.metadata.piece, Piece::Dark);
        assert_eq!(data.metadata.hyperparameters.batch_size, 32);

        let mut restored = DqnAgent::new(Piece::Dark, DqnConfig::default()).unwrap();
        data.restore(&mut restored).unwrap();
        assert!((restored.epsilon() - 0.3).abs() < 1e-6);
        assert_eq!(restored.episode_count(), 1);

        let state = GameState::initial();
        assert_eq!(restored.q_values(&state), agent.q_values(&state));
    }

    #[test]
    fn test_latest_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        let agent = test_agent();

        manager.save_checkpoint(&agent, &test_metrics(), 1000).unwrap();
        manager.save_checkpoint(&agent, &test_metrics(), 2000).unwrap();

        let latest = manager.load_latest().unwrap();
        assert_eq!(latest.metadata.episode, 2000);
    }

    #[test]
    fn test_list_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 10, 10);
        let agent = test_agent();

        for ep in [1000, 2000, 3000] {
            manager.save_checkpoint(&agent, &test_metrics(), ep).unwrap();
        }

        let list = manager.list_checkpoints().unwrap();
        let episodes: Vec<usize> = list.iter().map(|(_, m)| m.episode).collect();
        assert_eq!(episodes, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 2, 1);
        let agent = test_agent();

        let win_rates = [0.5, 0.9, 0.3, 0.6, 0.7];
        for (i, &wr) in win_rates.iter().enumerate() {
            let ep = (i + 1) * 1000;
            let mut metrics = test_metrics();
            metrics.win_rate = wr;
            manager.save_checkpoint(&agent, &metrics, ep).unwrap();
        }

        // Last 2 (4000, 5000) plus best 1 (2000, wr=0.9)
        let list = manager.list_checkpoints().unwrap();
        let episodes: Vec<usize> = list.iter().map(|(_, m)| m.episode).collect();
        assert_eq!(episodes, vec![2000, 4000, 5000]);
    }

    #[test]
    fn test_load_latest_no_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);

        let err = manager.load_latest().unwrap_err();
        assert!(
            matches!(err, CheckpointError::NoLatestSymlink(_)),
            "expected NoLatestSymlink, got: {err}"
        );
    }

    #[test]
    fn test_failed_save_removes_tmp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        let agent = test_agent();

        // A directory where the weights file should go makes the save fail
        let tmp_dir = dir.path().join("checkpoint_0000007.tmp");
        fs::create_dir_all(tmp_dir.join("q_network.mpk")).unwrap();

        let err = manager
            .save_checkpoint(&agent, &test_metrics(), 7)
            .unwrap_err();
        assert!(matches!(err, CheckpointError::ModelSave(_)));
        assert!(!tmp_dir.exists());
        assert!(!dir.path().join("checkpoint_0000007").exists());
        assert!(manager.list_checkpoints().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        let err = manager
            .load_checkpoint(&dir.path().join("checkpoint_0000001"))
            .unwrap_err();
        assert!(matches!(err, CheckpointError::DirNotFound(_)));
    }

    #[test]
    fn test_training_state_json() {
        let state = DqnTrainingState {
            epsilon: 0.25,
            step_count: 12,
            episode_count: 3,
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: DqnTrainingState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
