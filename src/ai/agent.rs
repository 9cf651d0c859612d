use crate::game::GameState;

/// A single step of experience for RL training.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: GameState,
    pub action: usize,
    pub reward: f32,
    pub next_state: GameState,
    pub done: bool,
}

/// Universal interface for anything that can play a side of a game.
pub trait Agent {
    /// Select an action index given the current game state.
    /// When `training` is true, the agent may explore; otherwise it exploits.
    fn select_action(&mut self, state: &GameState, training: bool) -> usize;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}
