use crate::ai::{Agent, DqnAgent, RandomAgent};
use crate::error::TrainingError;
use crate::game::{GameOutcome, GameState, Piece};
use crate::training::metrics::EpisodeResult;

const WIN_REWARD: f32 = 1.0;
const LOSS_REWARD: f32 = -1.0;
const DRAW_REWARD: f32 = 0.0;

/// Result of playing a single training episode.
pub struct EpisodeTrace {
    pub result: EpisodeResult,
    /// Loss of every training step taken during the episode
    pub losses: Vec<f32>,
    /// Transitions handed to the agent
    pub transitions: usize,
}

/// Play one game of `agent` (on its own piece) against `opponent`.
///
/// Each agent decision becomes one transition whose `next_state` is the
/// next position where the agent must move again, or the terminal position.
/// Every transition is passed through `DqnAgent::consume`.
pub fn play_training_episode(
    agent: &mut DqnAgent,
    opponent: &mut dyn Agent,
    capture_reward: f32,
) -> Result<EpisodeTrace, TrainingError> {
    let me = agent.piece();
    let mut state = GameState::initial();
    let mut pending: Option<(GameState, usize)> = None;
    let mut losses = Vec::new();
    let mut transitions = 0;
    let mut plies = 0;

    while !state.is_terminal() {
        let action = if state.current_player() == me {
            if let Some((prev, prev_action)) = pending.take() {
                let reward = material_reward(&prev, &state, me, capture_reward);
                transitions += 1;
                if let Some(loss) = agent.consume(prev, prev_action, state, reward, false)? {
                    losses.push(loss);
                }
            }
            let action = agent.select_action(&state, true);
            pending = Some((state, action));
            action
        } else {
            opponent.select_action(&state, true)
        };
        state = apply(&state, action)?;
        plies += 1;
    }

    let outcome = state.outcome().ok_or(TrainingError::MissingOutcome)?;
    if let Some((prev, prev_action)) = pending.take() {
        let reward =
            material_reward(&prev, &state, me, capture_reward) + terminal_reward(&outcome, me);
        transitions += 1;
        if let Some(loss) = agent.consume(prev, prev_action, state, reward, true)? {
            losses.push(loss);
        }
    }
    agent.finish_episode();

    Ok(EpisodeTrace {
        result: EpisodeResult {
            winner: winner_of(&outcome),
            game_length: plies,
        },
        losses,
        transitions,
    })
}

/// Shaping reward for material won minus material lost between two states.
pub fn material_reward(before: &GameState, after: &GameState, me: Piece, capture_reward: f32) -> f32 {
    let taken = before.piece_count(me.other()) - after.piece_count(me.other());
    let lost = before.piece_count(me) - after.piece_count(me);
    capture_reward * (taken as f32 - lost as f32)
}

pub fn terminal_reward(outcome: &GameOutcome, me: Piece) -> f32 {
    match outcome {
        GameOutcome::Winner(winner) if *winner == me => WIN_REWARD,
        GameOutcome::Winner(_) => LOSS_REWARD,
        GameOutcome::Draw => DRAW_REWARD,
    }
}

fn winner_of(outcome: &GameOutcome) -> Option<Piece> {
    match outcome {
        GameOutcome::Winner(p) => Some(*p),
        GameOutcome::Draw => None,
    }
}

fn apply(state: &GameState, action: usize) -> Result<GameState, TrainingError> {
    state
        .apply_action(action)
        .map_err(|_| TrainingError::IllegalAction {
            action,
            legal: state.legal_actions(),
        })
}

/// Play a single greedy evaluation game between two agents.
/// Returns the finished game's result.
pub fn play_eval_game(
    agent: &mut dyn Agent,
    opponent: &mut dyn Agent,
    agent_piece: Piece,
) -> Result<EpisodeResult, TrainingError> {
    let mut state = GameState::initial();
    let mut plies = 0;

    while !state.is_terminal() {
        let action = if state.current_player() == agent_piece {
            agent.select_action(&state, false)
        } else {
            opponent.select_action(&state, false)
        };
        state = apply(&state, action)?;
        plies += 1;
    }

    let outcome = state.outcome().ok_or(TrainingError::MissingOutcome)?;
    Ok(EpisodeResult {
        winner: winner_of(&outcome),
        game_length: plies,
    })
}

/// Evaluate the agent greedily against a random opponent over N games.
/// Returns the agent's win rate.
pub fn evaluate(agent: &mut DqnAgent, eval_games: usize) -> Result<f32, TrainingError> {
    if eval_games == 0 {
        return Ok(0.0);
    }
    let piece = agent.piece();
    let mut random = RandomAgent::new();
    let mut wins = 0;

    for _ in 0..eval_games {
        let result = play_eval_game(agent, &mut random, piece)?;
        if result.winner == Some(piece) {
            wins += 1;
        }
    }

    Ok(wins as f32 / eval_games as f32)
}
