use std::collections::VecDeque;

use crate::game::Piece;

/// Result of a single episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeResult {
    pub winner: Option<Piece>,
    pub game_length: usize,
}

/// Training metrics tracker with rolling window computations, seen from
/// the side the agent plays.
pub struct TrainingMetrics {
    piece: Piece,
    episode_results: VecDeque<EpisodeResult>,
    update_losses: VecDeque<f32>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
}

impl TrainingMetrics {
    pub fn with_capacity(piece: Piece, capacity: usize) -> Self {
        TrainingMetrics {
            piece,
            episode_results: VecDeque::with_capacity(capacity),
            update_losses: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
        }
    }

    pub fn new(piece: Piece) -> Self {
        Self::with_capacity(piece, 100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    pub fn record_update(&mut self, loss: f32) {
        self.update_losses.push_back(loss);
        if self.update_losses.len() > self.capacity {
            self.update_losses.pop_front();
        }
    }

    /// Fraction of the last N episodes whose winner matches `filter`.
    fn rate(&self, last_n: usize, filter: impl Fn(&EpisodeResult) -> bool) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let hits = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .filter(|r| filter(r))
            .count();
        hits as f32 / n as f32
    }

    /// Win rate for the agent's side in the last N episodes.
    pub fn win_rate(&self, last_n: usize) -> f32 {
        let piece = self.piece;
        self.rate(last_n, |r| r.winner == Some(piece))
    }

    /// Draw rate in the last N episodes.
    pub fn draw_rate(&self, last_n: usize) -> f32 {
        self.rate(last_n, |r| r.winner.is_none())
    }

    /// Average loss over the last N updates.
    pub fn average_loss(&self, last_n: usize) -> f32 {
        let n = self.update_losses.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = self.update_losses.iter().rev().take(n).sum();
        sum / n as f32
    }

    /// Average game length (plies) over the last N episodes.
    pub fn average_game_length(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .map(|r| r.game_length)
            .sum();
        total as f32 / n as f32
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate() {
        let mut m = TrainingMetrics::new(Piece::Dark);
        for _ in 0..7 {
            m.record_episode(EpisodeResult {
                winner: Some(Piece::Dark),
                game_length: 10,
            });
        }
        for _ in 0..3 {
            m.record_episode(EpisodeResult {
                winner: Some(Piece::Light),
                game_length: 10,
            });
        }
        assert!((m.win_rate(10) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_win_rate_follows_agent_side() {
        let mut m = TrainingMetrics::new(Piece::Light);
        m.record_episode(EpisodeResult {
            winner: Some(Piece::Light),
            game_length: 30,
        });
        m.record_episode(EpisodeResult {
            winner: Some(Piece::Dark),
            game_length: 30,
        });
        assert!((m.win_rate(10) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_draw_rate() {
        let mut m = TrainingMetrics::new(Piece::Dark);
        m.record_episode(EpisodeResult {
            winner: None,
            game_length: 80,
        });
        m.record_episode(EpisodeResult {
            winner: Some(Piece::Dark),
            game_length: 10,
        });
        assert!((m.draw_rate(10) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_average_loss() {
        let mut m = TrainingMetrics::new(Piece::Dark);
        m.record_update(1.0);
        m.record_update(3.0);
        assert!((m.average_loss(10) - 2.0).abs() < 1e-6);
        assert!((m.average_loss(1) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_game_length() {
        let mut m = TrainingMetrics::new(Piece::Dark);
        m.record_episode(EpisodeResult {
            winner: None,
            game_length: 20,
        });
        m.record_episode(EpisodeResult {
            winner: None,
            game_length: 30,
        });
        assert!((m.average_game_length(10) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_is_capped_but_total_is_not() {
        let mut m = TrainingMetrics::with_capacity(Piece::Dark, 3);
        for _ in 0..5 {
            m.record_episode(EpisodeResult {
                winner: None,
                game_length: 1,
            });
        }
        assert_eq!(m.total_episodes(), 5);
        assert!((m.draw_rate(100) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let m = TrainingMetrics::new(Piece::Dark);
        assert_eq!(m.win_rate(10), 0.0);
        assert_eq!(m.average_loss(10), 0.0);
        assert_eq!(m.average_game_length(10), 0.0);
    }
}
