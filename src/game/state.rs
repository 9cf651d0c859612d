use super::action::{decode_action, encode_action, square_coords, square_index, NUM_ACTIONS};
use super::{Board, Cell, Direction, Move, Piece};

/// Consecutive plies without a capture after which the game is drawn.
pub const DRAW_PLY_LIMIT: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Winner(Piece),
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("game is already over")]
    GameOver,

    #[error("action {0} is outside the action space")]
    InvalidAction(usize),

    #[error("action {0} is not legal in this position")]
    IllegalAction(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameState {
    board: Board,
    current_player: Piece,
    /// Square of a piece that must keep jumping this turn
    forced_piece: Option<usize>,
    plies_without_capture: usize,
    outcome: Option<GameOutcome>,
}

impl GameState {
    /// Create initial game state
    pub fn initial() -> Self {
        GameState {
            board: Board::initial(),
            current_player: Piece::Dark, // Dark starts
            forced_piece: None,
            plies_without_capture: 0,
            outcome: None,
        }
    }

    /// Build a state from an arbitrary position with `to_move` on turn.
    pub fn from_board(board: Board, to_move: Piece) -> Self {
        let mut state = GameState {
            board,
            current_player: to_move,
            forced_piece: None,
            plies_without_capture: 0,
            outcome: None,
        };
        state.outcome = state.resolve_outcome();
        state
    }

    /// Get current player
    pub fn current_player(&self) -> Piece {
        self.current_player
    }

    /// Get reference to board
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Get game outcome if game is over
    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// Check if game is over
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Square index of the piece in the middle of a multi-jump, if any
    pub fn forced_piece(&self) -> Option<usize> {
        self.forced_piece
    }

    pub fn plies_without_capture(&self) -> usize {
        self.plies_without_capture
    }

    pub fn piece_count(&self, piece: Piece) -> usize {
        self.board.count(piece)
    }

    /// Legal action indices for the side to move. Captures are mandatory.
    pub fn legal_actions(&self) -> Vec<usize> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.generate_actions()
    }

    /// Legal actions resolved into moves.
    pub fn legal_moves(&self) -> Vec<Move> {
        self.legal_actions()
            .into_iter()
            .filter_map(|action| self.decode_move(action).ok())
            .collect()
    }

    /// Resolve an action index into a move, checking legality.
    pub fn decode_move(&self, action: usize) -> Result<Move, MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }
        let (square, direction) = decode_action(action).ok_or(MoveError::InvalidAction(action))?;
        let from = square_coords(square);
        let captures_available = self.has_any_capture();

        if captures_available && self.jump_target(from, direction).is_some() {
            if let Some(forced) = self.forced_piece {
                if forced != square {
                    return Err(MoveError::IllegalAction(action));
                }
            }
            let (dr, dc) = direction.delta();
            let to = (
                (from.0 as i32 + 2 * dr) as usize,
                (from.1 as i32 + 2 * dc) as usize,
            );
            return Ok(Move {
                from,
                to,
                direction,
                capture: true,
            });
        }

        if !captures_available {
            if let Some(to) = self.step_target(from, direction) {
                return Ok(Move {
                    from,
                    to,
                    direction,
                    capture: false,
                });
            }
        }

        Err(MoveError::IllegalAction(action))
    }

    /// Apply an action and return new state (immutable)
    pub fn apply_action(&self, action: usize) -> Result<GameState, MoveError> {
        if action >= NUM_ACTIONS {
            return Err(MoveError::InvalidAction(action));
        }
        let mv = self.decode_move(action)?;

        let mut board = self.board;
        let moving = board.get(mv.from.0, mv.from.1);
        board.set(mv.from.0, mv.from.1, Cell::Empty);
        if let Some((r, c)) = mv.captured_square() {
            board.set(r, c, Cell::Empty);
        }

        let promoted = !moving.is_king() && mv.to.0 == self.current_player.promotion_row();
        let landed = if promoted {
            Cell::King(self.current_player)
        } else {
            moving
        };
        board.set(mv.to.0, mv.to.1, landed);

        let mut next = GameState {
            board,
            current_player: self.current_player,
            forced_piece: None,
            plies_without_capture: if mv.capture {
                0
            } else {
                self.plies_without_capture + 1
            },
            outcome: None,
        };

        // Crowning ends the turn even if another jump would be available
        let continues = mv.capture && !promoted && next.piece_can_capture(mv.to);
        if continues {
            next.forced_piece = square_index(mv.to.0, mv.to.1);
        } else {
            next.current_player = self.current_player.other();
        }

        next.outcome = next.resolve_outcome();
        Ok(next)
    }

    fn resolve_outcome(&self) -> Option<GameOutcome> {
        if self.generate_actions().is_empty() {
            Some(GameOutcome::Winner(self.current_player.other()))
        } else if self.plies_without_capture >= DRAW_PLY_LIMIT {
            Some(GameOutcome::Draw)
        } else {
            None
        }
    }

    fn generate_actions(&self) -> Vec<usize> {
        let mut jumps = Vec::new();
        let mut steps = Vec::new();

        for row in 0..super::BOARD_SIZE {
            for col in 0..super::BOARD_SIZE {
                let Some(square) = square_index(row, col) else {
                    continue;
                };
                if self.board.get(row, col).piece() != Some(self.current_player) {
                    continue;
                }
                if let Some(forced) = self.forced_piece {
                    if forced != square {
                        continue;
                    }
                }
                for direction in self.directions_for((row, col)) {
                    if self.jump_target((row, col), direction).is_some() {
                        jumps.push(encode_action(square, direction));
                    } else if self.forced_piece.is_none()
                        && self.step_target((row, col), direction).is_some()
                    {
                        steps.push(encode_action(square, direction));
                    }
                }
            }
        }

        if jumps.is_empty() {
            steps
        } else {
            jumps
        }
    }

    /// Diagonals the piece on `pos` may use; empty when it is not ours.
    fn directions_for(&self, pos: (usize, usize)) -> Vec<Direction> {
        match self.board.get(pos.0, pos.1) {
            Cell::King(p) if p == self.current_player => Direction::ALL.to_vec(),
            Cell::Man(p) if p == self.current_player => p.forward_directions().to_vec(),
            _ => Vec::new(),
        }
    }

    fn offset(pos: (usize, usize), direction: Direction, distance: i32) -> Option<(usize, usize)> {
        let (dr, dc) = direction.delta();
        let r = pos.0 as i32 + dr * distance;
        let c = pos.1 as i32 + dc * distance;
        if Board::in_bounds(r, c) {
            Some((r as usize, c as usize))
        } else {
            None
        }
    }

    fn step_target(&self, from: (usize, usize), direction: Direction) -> Option<(usize, usize)> {
        if !self.directions_for(from).contains(&direction) {
            return None;
        }
        let to = Self::offset(from, direction, 1)?;
        (self.board.get(to.0, to.1) == Cell::Empty).then_some(to)
    }

    fn jump_target(&self, from: (usize, usize), direction: Direction) -> Option<(usize, usize)> {
        if !self.directions_for(from).contains(&direction) {
            return None;
        }
        let over = Self::offset(from, direction, 1)?;
        let to = Self::offset(from, direction, 2)?;
        let jumped = self.board.get(over.0, over.1).piece();
        (jumped == Some(self.current_player.other()) && self.board.get(to.0, to.1) == Cell::Empty)
            .then_some(to)
    }

    fn piece_can_capture(&self, pos: (usize, usize)) -> bool {
        Direction::ALL
            .iter()
            .any(|&d| self.jump_target(pos, d).is_some())
    }

    fn has_any_capture(&self) -> bool {
        let actions = self.generate_actions();
        actions.first().is_some_and(|&action| {
            decode_action(action)
                .map(|(sq, d)| self.jump_target(square_coords(sq), d).is_some())
                .unwrap_or(false)
        })
    }
}
