use super::Direction;
use crate::error::AgentError;

/// The two sides of a checkers game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Piece {
    Dark,
    Light,
}

impl Piece {
    /// Get the other side
    pub fn other(self) -> Piece {
        match self {
            Piece::Dark => Piece::Light,
            Piece::Light => Piece::Dark,
        }
    }

    /// Get side name for display
    pub fn name(self) -> &'static str {
        match self {
            Piece::Dark => "Dark",
            Piece::Light => "Light",
        }
    }

    /// Diagonals a man of this side may move along
    pub fn forward_directions(self) -> [Direction; 2] {
        match self {
            Piece::Dark => [Direction::DownLeft, Direction::DownRight],
            Piece::Light => [Direction::UpLeft, Direction::UpRight],
        }
    }

    /// Row on which a man of this side is crowned
    pub fn promotion_row(self) -> usize {
        match self {
            Piece::Dark => super::BOARD_SIZE - 1,
            Piece::Light => 0,
        }
    }
}

impl TryFrom<u8> for Piece {
    type Error = AgentError;

    /// 0 is dark, 1 is light; anything else is rejected.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Piece::Dark),
            1 => Ok(Piece::Light),
            other => Err(AgentError::InvalidPieceType(other)),
        }
    }
}
