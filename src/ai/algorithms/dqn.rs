use std::path::{Path, PathBuf};

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::TensorData;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::agent::{Agent, Transition};
use crate::ai::networks::{DqnNetwork, DqnNetworkConfig};
use crate::ai::policy::{greedy, EpsilonGreedy};
use crate::ai::state_encoding::{encode_state, encode_states_batch};
use crate::checkpoint::DqnTrainingState;
use crate::error::AgentError;
use crate::game::{GameState, Move, MoveError, Piece, NUM_ACTIONS};
use crate::training::replay_buffer::ReplayBuffer;

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;

/// DQN hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Buffer size at which `consume` starts training
    pub train_start: usize,
    pub conv_channels: usize,
    pub hidden_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Policy weights to load at construction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_model: Option<PathBuf>,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 1e-3,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_decay: 0.999,
            epsilon_min: 0.01,
            batch_size: 32,
            replay_capacity: 2000,
            train_start: 1000,
            conv_channels: 16,
            hidden_size: 8,
            seed: None,
            load_model: None,
        }
    }
}

impl DqnConfig {
    /// Reject settings the agent cannot run with: an empty buffer, or a
    /// `train_start` that would sample before a full batch is stored.
    pub fn check(&self) -> Result<(), AgentError> {
        let invalid = |msg: &str| Err(AgentError::InvalidConfig(msg.into()));
        if self.replay_capacity == 0 {
            return invalid("replay_capacity must be > 0");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be > 0");
        }
        if self.batch_size > self.train_start {
            return invalid("train_start must be >= batch_size");
        }
        if self.train_start > self.replay_capacity {
            return invalid("train_start must be <= replay_capacity");
        }
        Ok(())
    }

    fn network_config(&self) -> DqnNetworkConfig {
        DqnNetworkConfig::new()
            .with_conv_channels(self.conv_channels)
            .with_hidden_size(self.hidden_size)
            .with_num_actions(NUM_ACTIONS)
    }
}

/// Build the training label matrix for one mini-batch.
///
/// Starts from the policy network's own `predictions` ([B, A], row-major) and
/// overwrites only the taken action of each row with its Bellman target:
/// `reward` for terminal transitions, otherwise
/// `reward + gamma * max(next_q[i])`. Untouched entries contribute zero loss.
pub fn bellman_targets(
    predictions: &[f32],
    next_q: &[f32],
    batch: &[Transition],
    num_actions: usize,
    gamma: f32,
) -> Vec<f32> {
    let mut targets = predictions.to_vec();
    for (i, transition) in batch.iter().enumerate() {
        let target = if transition.done {
            transition.reward
        } else {
            let row = &next_q[i * num_actions..(i + 1) * num_actions];
            let max_q = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            transition.reward + gamma * max_q
        };
        targets[i * num_actions + transition.action] = target;
    }
    targets
}

/// DQN agent with policy + target networks, replay buffer, and Adam optimizer.
pub struct DqnAgent {
    name: String,
    piece: Piece,
    q_network: DqnNetwork<TrainBackend>,
    target_network: DqnNetwork<InferBackend>,
    optimizer: OptimizerAdaptor<Adam, DqnNetwork<TrainBackend>, TrainBackend>,
    replay_buffer: ReplayBuffer<Transition>,
    policy: EpsilonGreedy,
    config: DqnConfig,
    device: <TrainBackend as Backend>::Device,
    step_count: usize,
    episode_count: usize,
    last_loss: Option<f32>,
    rng: StdRng,
}

impl DqnAgent {
    /// Create an agent playing `piece`. Loads `config.load_model` when set.
    pub fn new(piece: Piece, config: DqnConfig) -> Result<Self, AgentError> {
        config.check()?;
        let device = Default::default();
        let net_config = config.network_config();
        let q_network: DqnNetwork<TrainBackend> = net_config.init(&device);
        let target_network: DqnNetwork<InferBackend> = net_config.init(&device);
        let optimizer = AdamConfig::new().init();

        let (replay_buffer, rng) = match config.seed {
            Some(seed) => (
                ReplayBuffer::with_seed(config.replay_capacity, seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (
                ReplayBuffer::new(config.replay_capacity),
                StdRng::from_os_rng(),
            ),
        };
        let policy = EpsilonGreedy::new(config.epsilon_start, config.epsilon_decay, config.epsilon_min);

        let mut agent = DqnAgent {
            name: format!("DqnAgent{}", piece.name()),
            piece,
            q_network,
            target_network,
            optimizer,
            replay_buffer,
            policy,
            config,
            device,
            step_count: 0,
            episode_count: 0,
            last_loss: None,
            rng,
        };
        agent.update_target_model();

        if let Some(path) = agent.config.load_model.clone() {
            agent.load_model(&path)?;
            info!("{} loaded weights from {}", agent.name, path.display());
        }

        Ok(agent)
    }

    /// Create an agent from a raw piece code (0 = dark, 1 = light).
    pub fn from_raw_piece(piece: u8, config: DqnConfig) -> Result<Self, AgentError> {
        let piece = Piece::try_from(piece)?;
        Self::new(piece, config)
    }

    /// Copy every policy-network parameter into the target network.
    pub fn update_target_model(&mut self) {
        self.target_network = self.q_network.valid();
    }

    /// Raw policy-network Q-values for one state, one per action.
    pub fn q_values(&self, state: &GameState) -> Vec<f32> {
        let input = encode_state::<InferBackend>(state, &self.device).unsqueeze::<4>(); // [1, 1, 8, 8]
        self.q_network
            .valid()
            .forward(input)
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction")
    }

    /// Raw target-network Q-values for one state.
    pub fn target_q_values(&self, state: &GameState) -> Vec<f32> {
        let input = encode_state::<InferBackend>(state, &self.device).unsqueeze::<4>();
        self.target_network
            .forward(input)
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction")
    }

    /// Select an action index: epsilon-greedy when training, greedy otherwise.
    /// Only legal actions are ever returned.
    pub fn get_action(&mut self, state: &GameState, training: bool) -> usize {
        let legal = state.legal_actions();
        assert!(!legal.is_empty(), "No legal actions");

        let q_values = self.q_values(state);
        if training {
            self.policy.select(&mut self.rng, &q_values, &legal)
        } else {
            greedy(&q_values, &legal)
        }
    }

    /// Choose a move for the environment.
    pub fn act(&mut self, state: &GameState) -> Result<Move, MoveError> {
        let action = self.get_action(state, true);
        state.decode_move(action)
    }

    /// Store a transition without training.
    pub fn append_sample(&mut self, transition: Transition) {
        self.replay_buffer.push(transition);
    }

    /// Store a transition, then take one training step once the buffer has
    /// reached `train_start`. Returns the step's loss if one was taken.
    pub fn consume(
        &mut self,
        state: GameState,
        action: usize,
        next_state: GameState,
        reward: f32,
        done: bool,
    ) -> Result<Option<f32>, AgentError> {
        self.append_sample(Transition {
            state,
            action,
            reward,
            next_state,
            done,
        });

        if self.replay_buffer.len() >= self.config.train_start {
            self.train_model().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Perform one gradient update step from the replay buffer.
    ///
    /// Epsilon decays first, even if sampling then fails.
    pub fn train_model(&mut self) -> Result<f32, AgentError> {
        self.policy.decay();

        let batch = self.replay_buffer.sample(self.config.batch_size)?;
        let batch_size = batch.len();

        let states: Vec<GameState> = batch.iter().map(|t| t.state).collect();
        let next_states: Vec<GameState> = batch.iter().map(|t| t.next_state).collect();

        // Forward pass on current states: [B, A]
        let state_tensors = encode_states_batch::<TrainBackend>(&states, &self.device);
        let predictions = self.q_network.forward(state_tensors);
        let prediction_data: Vec<f32> = predictions
            .clone()
            .detach()
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction");

        // Target network runs on the inference backend, no grad
        let next_state_tensors = encode_states_batch::<InferBackend>(&next_states, &self.device);
        let next_q_data: Vec<f32> = self
            .target_network
            .forward(next_state_tensors)
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction");

        let target_data = bellman_targets(
            &prediction_data,
            &next_q_data,
            &batch,
            NUM_ACTIONS,
            self.config.gamma,
        );
        let targets = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(target_data.as_slice()),
            &self.device,
        )
        .reshape([batch_size as i32, NUM_ACTIONS as i32]);

        let loss = MseLoss::new().forward(predictions, targets, Reduction::Mean);
        let loss_val: f32 = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .expect("f32 loss tensor extraction")[0];

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.q_network);
        self.q_network = self
            .optimizer
            .step(self.config.learning_rate, self.q_network.clone(), grads);

        self.step_count += 1;
        self.last_loss = Some(loss_val);
        debug!(
            "{} step {} | loss: {:.5} | eps: {:.4}",
            self.name,
            self.step_count,
            loss_val,
            self.policy.epsilon()
        );

        Ok(loss_val)
    }

    /// Mark the end of an episode.
    pub fn finish_episode(&mut self) {
        self.episode_count += 1;
    }

    pub fn piece(&self) -> Piece {
        self.piece
    }

    pub fn epsilon(&self) -> f32 {
        self.policy.epsilon()
    }

    /// Set epsilon directly (e.g. 0.0 for pure greedy inference).
    pub fn set_epsilon(&mut self, eps: f32) {
        self.policy.set_epsilon(eps);
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn last_loss(&self) -> Option<f32> {
        self.last_loss
    }

    pub fn replay_len(&self) -> usize {
        self.replay_buffer.len()
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// Load policy-network weights from a single file, then sync the target.
    pub fn load_model(&mut self, path: &Path) -> Result<(), AgentError> {
        let recorder = DefaultRecorder::default();
        let q: DqnNetwork<TrainBackend> = self
            .config
            .network_config()
            .init(&self.device)
            .load_file(path.to_path_buf(), &recorder, &self.device)
            .map_err(|e| AgentError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        self.q_network = q;
        self.update_target_model();
        Ok(())
    }

    /// Save policy-network weights to a single file.
    pub fn save_model(&self, path: &Path) -> Result<(), AgentError> {
        let recorder = DefaultRecorder::default();
        self.q_network
            .clone()
            .valid()
            .save_file(path.to_path_buf(), &recorder)
            .map_err(|e| AgentError::ModelSave(format!("{}: {}", path.display(), e)))
    }

    /// Save both networks to a directory.
    pub fn save_to_dir(&self, dir: &Path) -> Result<(), AgentError> {
        self.save_model(&dir.join("q_network"))?;
        let recorder = DefaultRecorder::default();
        self.target_network
            .clone()
            .save_file(dir.join("target_network"), &recorder)
            .map_err(|e| AgentError::ModelSave(e.to_string()))
    }

    /// Load both networks from a directory.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<(), AgentError> {
        let recorder = DefaultRecorder::default();
        let net_config = self.config.network_config();

        let q: DqnNetwork<TrainBackend> = net_config
            .init(&self.device)
            .load_file(dir.join("q_network"), &recorder, &self.device)
            .map_err(|e| AgentError::ModelLoad(e.to_string()))?;
        self.q_network = q;

        let target: DqnNetwork<InferBackend> = net_config
            .init(&self.device)
            .load_file(dir.join("target_network"), &recorder, &self.device)
            .map_err(|e| AgentError::ModelLoad(e.to_string()))?;
        self.target_network = target;
        Ok(())
    }

    /// Export current training state for checkpointing.
    pub fn training_state(&self) -> DqnTrainingState {
        DqnTrainingState {
            epsilon: self.policy.epsilon(),
            step_count: self.step_count,
            episode_count: self.episode_count,
        }
    }

    /// Restore training state from a checkpoint.
    pub fn restore_training_state(&mut self, state: &DqnTrainingState) {
        self.policy.set_epsilon(state.epsilon);
        self.step_count = state.step_count;
        self.episode_count = state.episode_count;
    }
}

impl Agent for DqnAgent {
    fn select_action(&mut self, state: &GameState, training: bool) -> usize {
        self.get_action(state, training)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplayError;

    fn small_config() -> DqnConfig {
        DqnConfig {
            batch_size: 2,
            replay_capacity: 16,
            train_start: 4,
            seed: Some(11),
            ..Default::default()
        }
    }

    fn opening_transitions() -> Vec<Transition> {
        let state = GameState::initial();
        state
            .legal_actions()
            .into_iter()
            .enumerate()
            .map(|(i, action)| Transition {
                state,
                action,
                reward: i as f32 * 0.1,
                next_state: state.apply_action(action).unwrap(),
                done: i % 3 == 0,
            })
            .collect()
    }

    #[test]
    fn test_agent_names() {
        let dark = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        let light = DqnAgent::from_raw_piece(1, small_config()).unwrap();
        assert_eq!(dark.name(), "DqnAgentDark");
        assert_eq!(light.name(), "DqnAgentLight");
        assert_eq!(light.piece(), Piece::Light);
    }

    #[test]
    fn test_invalid_piece_rejected() {
        let result = DqnAgent::from_raw_piece(2, small_config());
        assert!(matches!(result, Err(AgentError::InvalidPieceType(2))));
    }

    #[test]
    fn test_unusable_configs_rejected() {
        let empty = DqnConfig {
            replay_capacity: 0,
            ..small_config()
        };
        assert!(matches!(
            DqnAgent::new(Piece::Dark, empty),
            Err(AgentError::InvalidConfig(_))
        ));

        let early_start = DqnConfig {
            batch_size: 8,
            train_start: 4,
            ..small_config()
        };
        assert!(matches!(
            DqnAgent::new(Piece::Dark, early_start),
            Err(AgentError::InvalidConfig(_))
        ));

        let late_start = DqnConfig {
            train_start: 32,
            ..small_config()
        };
        assert!(matches!(
            DqnAgent::new(Piece::Light, late_start),
            Err(AgentError::InvalidConfig(_))
        ));

        assert!(DqnConfig::default().check().is_ok());
    }

    #[test]
    fn test_greedy_action_is_legal_argmax() {
        let mut agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        let state = GameState::initial();
        let legal = state.legal_actions();
        let q = agent.q_values(&state);
        assert_eq!(q.len(), NUM_ACTIONS);

        let expected = greedy(&q, &legal);
        for _ in 0..5 {
            assert_eq!(agent.get_action(&state, false), expected);
        }
    }

    #[test]
    fn test_exploring_actions_are_legal() {
        let mut agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        let state = GameState::initial();
        let legal = state.legal_actions();
        for _ in 0..50 {
            let action = agent.get_action(&state, true);
            assert!(legal.contains(&action), "Action {} is not legal", action);
        }
    }

    #[test]
    fn test_act_returns_legal_move() {
        let mut agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        let state = GameState::initial();
        let mv = agent.act(&state).unwrap();
        assert!(state.legal_moves().contains(&mv));
    }

    #[test]
    fn test_consume_trains_only_after_train_start() {
        let mut agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        let transitions = opening_transitions();

        for t in &transitions[..3] {
            let loss = agent
                .consume(t.state, t.action, t.next_state, t.reward, t.done)
                .unwrap();
            assert!(loss.is_none());
        }
        assert_eq!(agent.step_count(), 0);
        assert_eq!(agent.epsilon(), 1.0);

        let t = &transitions[3];
        let loss = agent
            .consume(t.state, t.action, t.next_state, t.reward, t.done)
            .unwrap();
        assert!(loss.is_some_and(f32::is_finite));
        assert_eq!(agent.step_count(), 1);
        assert!((agent.epsilon() - 0.999).abs() < 1e-6);
    }

    #[test]
    fn test_train_model_underflow_fails_loudly() {
        let mut agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        agent.append_sample(opening_transitions().remove(0));

        let err = agent.train_model().unwrap_err();
        assert!(matches!(
            err,
            AgentError::Replay(ReplayError::Underflow {
                requested: 2,
                available: 1
            })
        ));
        // Decay happens before sampling
        assert!(agent.epsilon() < 1.0);
        assert_eq!(agent.step_count(), 0);
    }

    #[test]
    fn test_epsilon_never_below_floor() {
        let mut agent = DqnAgent::new(
            Piece::Dark,
            DqnConfig {
                epsilon_decay: 0.5,
                ..small_config()
            },
        )
        .unwrap();
        for t in opening_transitions() {
            agent.append_sample(t);
        }
        for _ in 0..20 {
            agent.train_model().unwrap();
            assert!(agent.epsilon() >= 0.01);
        }
        assert!((agent.epsilon() - 0.01).abs() < 1e-7);
    }

    #[test]
    fn test_target_sync_gives_identical_outputs() {
        let mut agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        let state = GameState::initial();
        assert_eq!(agent.q_values(&state), agent.target_q_values(&state));

        for t in opening_transitions() {
            agent.append_sample(t);
        }
        for _ in 0..5 {
            agent.train_model().unwrap();
        }
        assert_ne!(agent.q_values(&state), agent.target_q_values(&state));

        agent.update_target_model();
        assert_eq!(agent.q_values(&state), agent.target_q_values(&state));
    }

    #[test]
    fn test_bellman_target_terminal_is_reward() {
        let state = GameState::initial();
        let batch = vec![Transition {
            state,
            action: 2,
            reward: -1.0,
            next_state: state,
            done: true,
        }];
        let predictions = [0.3, 0.1, 0.7, 0.2];
        let next_q = [5.0, 6.0, 7.0, 8.0];

        let targets = bellman_targets(&predictions, &next_q, &batch, 4, 0.99);
        assert_eq!(targets, vec![0.3, 0.1, -1.0, 0.2]);
    }

    #[test]
    fn test_bellman_target_bootstraps_from_target_max() {
        let state = GameState::initial();
        let batch = vec![
            Transition {
                state,
                action: 0,
                reward: 0.5,
                next_state: state,
                done: false,
            },
            Transition {
                state,
                action: 3,
                reward: 0.0,
                next_state: state,
                done: false,
            },
        ];
        let predictions = [0.0; 8];
        let next_q = [1.0, 4.0, 2.0, -3.0, -1.0, -2.0, -0.5, -4.0];

        let targets = bellman_targets(&predictions, &next_q, &batch, 4, 0.9);
        assert!((targets[0] - (0.5 + 0.9 * 4.0)).abs() < 1e-6);
        assert!((targets[7] - (0.9 * -0.5)).abs() < 1e-6);
        // Only the taken action changes
        assert_eq!(&targets[1..4], &[0.0, 0.0, 0.0]);
        assert_eq!(&targets[4..7], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        for t in opening_transitions() {
            agent.append_sample(t);
        }
        agent.train_model().unwrap();
        agent.save_to_dir(dir.path()).unwrap();
        assert!(dir.path().join("q_network.mpk").exists());
        assert!(dir.path().join("target_network.mpk").exists());

        let state = GameState::initial();
        let mut restored = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        restored.load_from_dir(dir.path()).unwrap();
        assert_eq!(restored.q_values(&state), agent.q_values(&state));
        assert_eq!(restored.target_q_values(&state), agent.target_q_values(&state));
    }

    #[test]
    fn test_load_model_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy");
        let agent = DqnAgent::new(Piece::Light, small_config()).unwrap();
        agent.save_model(&path).unwrap();

        let loaded = DqnAgent::new(
            Piece::Light,
            DqnConfig {
                load_model: Some(path),
                ..small_config()
            },
        )
        .unwrap();
        let state = GameState::initial();
        assert_eq!(loaded.q_values(&state), agent.q_values(&state));
        assert_eq!(loaded.target_q_values(&state), agent.q_values(&state));
    }

    #[test]
    fn test_load_model_missing_file() {
        let result = DqnAgent::new(
            Piece::Dark,
            DqnConfig {
                load_model: Some(PathBuf::from("does/not/exist")),
                ..small_config()
            },
        );
        assert!(matches!(result, Err(AgentError::ModelLoad(_))));
    }

    #[test]
    fn test_training_state_roundtrip() {
        let mut agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        agent.set_epsilon(0.42);
        agent.finish_episode();

        let state = agent.training_state();
        assert!((state.epsilon - 0.42).abs() < 1e-6);
        assert_eq!(state.episode_count, 1);

        let mut new_agent = DqnAgent::new(Piece::Dark, small_config()).unwrap();
        new_agent.restore_training_state(&state);
        assert!((new_agent.epsilon() - 0.42).abs() < 1e-6);
        assert_eq!(new_agent.episode_count(), 1);
    }
}
