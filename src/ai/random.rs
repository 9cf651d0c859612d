use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::agent::Agent;
use crate::game::GameState;

/// Opponent that plays a uniformly random legal action.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new() -> Self {
        RandomAgent {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible opponent for seeded training runs and tests.
    pub fn with_seed(seed: u64) -> Self {
        RandomAgent {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn select_action(&mut self, state: &GameState, _training: bool) -> usize {
        *state
            .legal_actions()
            .choose(&mut self.rng)
            .expect("random agent asked to move in a finished game")
    }

    fn name(&self) -> &str {
        "Random"
    }
}
