use rand::Rng;

/// Epsilon-greedy action selection with a multiplicative, floored decay.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    epsilon: f32,
    decay: f32,
    min: f32,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f32, decay: f32, min: f32) -> Self {
        EpsilonGreedy {
            epsilon,
            decay,
            min,
        }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Set epsilon directly (e.g. 0.0 for pure greedy inference).
    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon;
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    /// One decay step: `epsilon = max(epsilon * decay, min)`.
    /// An epsilon already at or below the floor is left untouched.
    pub fn decay(&mut self) {
        if self.epsilon > self.min {
            self.epsilon = (self.epsilon * self.decay).max(self.min);
        }
    }

    /// Pick among `legal`: random with probability epsilon, otherwise the
    /// highest Q-value (first index wins ties).
    pub fn select<R: Rng>(&self, rng: &mut R, q_values: &[f32], legal: &[usize]) -> usize {
        assert!(!legal.is_empty(), "No legal actions");

        if rng.random::<f32>() < self.epsilon {
            return legal[rng.random_range(0..legal.len())];
        }
        greedy(q_values, legal)
    }
}

/// Highest-valued action among `legal`; the earliest one on ties.
pub fn greedy(q_values: &[f32], legal: &[usize]) -> usize {
    let mut best_action = legal[0];
    let mut best_q = f32::NEG_INFINITY;
    for &action in legal {
        if q_values[action] > best_q {
            best_q = q_values[action];
            best_action = action;
        }
    }
    best_action
}
