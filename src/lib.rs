//! # Checkers DQN
//!
//! A deep Q-learning agent for 8x8 checkers, built on the Burn ML framework.
//!
//! ## Modules
//!
//! - [`game`]: checkers rules, board, action encoding
//! - [`ai`]: agent trait, DQN agent, Q-network, epsilon-greedy policy, state encoding
//! - [`training`]: replay buffer, episode runner, metrics, trainer loop
//! - [`checkpoint`]: model persistence and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
