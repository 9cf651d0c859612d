use std::path::PathBuf;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::ai::{DqnAgent, RandomAgent};
use crate::checkpoint::{CheckpointManager, CheckpointManagerConfig, CheckpointMetrics};
use crate::error::TrainingError;
use crate::training::episode::{evaluate, play_training_episode};
use crate::training::metrics::TrainingMetrics;

/// Trainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub log_interval: usize,
    pub eval_interval: usize,
    pub eval_games: usize,
    pub checkpoint_interval: usize,
    pub checkpoint_dir: PathBuf,
    /// Episodes between target network syncs
    pub target_update_interval: usize,
    /// Shaping reward per piece of material won or lost
    pub capture_reward: f32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 1000,
            log_interval: 10,
            eval_interval: 100,
            eval_games: 20,
            checkpoint_interval: 100,
            checkpoint_dir: PathBuf::from("checkpoints"),
            target_update_interval: 1,
            capture_reward: 0.1,
        }
    }
}

/// Trains a DQN agent against a random opponent.
pub struct Trainer {
    config: TrainerConfig,
    checkpoint_manager: CheckpointManager,
}

impl Trainer {
    pub fn new(config: TrainerConfig, checkpoint: CheckpointManagerConfig) -> Self {
        let checkpoint_manager = CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: config.checkpoint_dir.clone(),
            ..checkpoint
        });
        Trainer {
            config,
            checkpoint_manager,
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run the full training loop. Returns the final evaluation win rate.
    pub fn train(&self, agent: &mut DqnAgent) -> Result<f32, TrainingError> {
        let mut metrics = TrainingMetrics::new(agent.piece());
        let mut opponent = match agent.config().seed {
            Some(seed) => RandomAgent::with_seed(seed.wrapping_add(2)),
            None => RandomAgent::new(),
        };

        let start_episode = agent.episode_count() + 1;
        let end_episode = agent.episode_count() + self.config.num_episodes;
        let window = self.config.log_interval;

        info!(
            "Starting DQN training as {} for {} episodes (episodes {}..{})",
            agent.piece().name(),
            self.config.num_episodes,
            start_episode,
            end_episode
        );

        for episode in start_episode..=end_episode {
            let trace =
                play_training_episode(agent, &mut opponent, self.config.capture_reward)?;
            for loss in &trace.losses {
                metrics.record_update(*loss);
            }
            metrics.record_episode(trace.result);

            if episode % self.config.target_update_interval == 0 {
                agent.update_target_model();
            }

            if episode % self.config.log_interval == 0 {
                info!(
                    "Episode {}/{} | eps: {:.3} | loss: {:.4} | win_rate({}): {:.1}% | draw: {:.1}% | avg_len: {:.1} | memory: {}",
                    episode,
                    end_episode,
                    agent.epsilon(),
                    metrics.average_loss(window),
                    window,
                    metrics.win_rate(window) * 100.0,
                    metrics.draw_rate(window) * 100.0,
                    metrics.average_game_length(window),
                    agent.replay_len(),
                );
            }

            let eval_due = self.config.eval_interval > 0 && episode % self.config.eval_interval == 0;
            let checkpoint_due = self.config.checkpoint_interval > 0
                && episode % self.config.checkpoint_interval == 0;

            if eval_due || checkpoint_due {
                let eval_wr = evaluate(agent, self.config.eval_games)?;
                info!(
                    "Eval vs random ({} games): {:.1}% win rate",
                    self.config.eval_games,
                    eval_wr * 100.0
                );

                if checkpoint_due {
                    let ckpt_metrics = CheckpointMetrics {
                        win_rate: eval_wr,
                        draw_rate: metrics.draw_rate(window),
                        average_game_length: metrics.average_game_length(window),
                        current_loss: metrics.average_loss(window),
                        training_steps: agent.step_count(),
                    };
                    match self
                        .checkpoint_manager
                        .save_checkpoint(agent, &ckpt_metrics, episode)
                    {
                        Ok(path) => info!("Checkpoint saved: {}", path.display()),
                        Err(e) => warn!("Checkpoint failed: {}", e),
                    }
                }
            }
        }

        info!(
            "Training complete. Episodes this run: {}, training steps: {}",
            metrics.total_episodes(),
            agent.step_count()
        );

        let final_wr = evaluate(agent, self.config.eval_games)?;
        info!("Final eval vs random: {:.1}% win rate", final_wr * 100.0);
        Ok(final_wr)
    }
}
