mod dqn;

pub use dqn::{bellman_targets, DqnAgent, DqnConfig};
