#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;

use checkers_dqn::ai::DqnAgent;
use checkers_dqn::checkpoint::{CheckpointManager, CheckpointManagerConfig};
use checkers_dqn::config::AppConfig;
use checkers_dqn::game::Piece;
use checkers_dqn::training::{Trainer, TrainerConfig};

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Dark,
    Light,
}

impl From<Side> for Piece {
    fn from(side: Side) -> Self {
        match side {
            Side::Dark => Piece::Dark,
            Side::Light => Piece::Light,
        }
    }
}

/// Train a checkers DQN agent against a random opponent.
#[derive(Parser)]
#[command(name = "train", about = "Train a checkers DQN agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Side the agent plays
    #[arg(long, value_enum, default_value = "dark")]
    piece: Side,

    /// Seed for replay sampling, exploration and the opponent
    #[arg(long)]
    seed: Option<u64>,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        app_config.dqn.learning_rate = lr;
    }
    if cli.seed.is_some() {
        app_config.dqn.seed = cli.seed;
    }
    app_config.validate().context("validating configuration")?;

    let mut agent = DqnAgent::new(cli.piece.into(), app_config.dqn.clone())
        .context("creating DQN agent")?;

    if cli.resume {
        resume_agent(&mut agent, &app_config.training, &app_config.checkpoint)?;
    }

    let trainer = Trainer::new(app_config.training, app_config.checkpoint);
    let win_rate = trainer.train(&mut agent).context("training")?;
    info!("Done. Final win rate vs random: {:.1}%", win_rate * 100.0);
    Ok(())
}

/// Restore the agent from the latest checkpoint, or start fresh if none exists.
fn resume_agent(
    agent: &mut DqnAgent,
    trainer_config: &TrainerConfig,
    checkpoint_config: &CheckpointManagerConfig,
) -> Result<()> {
    let manager = CheckpointManager::new(CheckpointManagerConfig {
        checkpoint_dir: trainer_config.checkpoint_dir.clone(),
        ..checkpoint_config.clone()
    });
    match manager.load_latest() {
        Ok(data) => {
            data.restore(agent)
                .with_context(|| format!("restoring checkpoint {}", data.path.display()))?;
            info!(
                "Resumed from episode {} (eps {:.3})",
                data.metadata.episode,
                agent.epsilon()
            );
        }
        Err(e) => info!("No checkpoint found ({}), starting fresh", e),
    }
    Ok(())
}
