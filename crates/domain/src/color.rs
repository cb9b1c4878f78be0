//! Sides and player colors.
//!
//! `Side` is one of the two players on the board and is what "current turn"
//! means. `PlayerColor` is what the local user plays, which may be unknown
//! (spectators, or before the cold-load metadata has resolved).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Side to move once `ply` half-moves have been played. White moves on even plies.
    pub fn for_ply(ply: usize) -> Self {
        if ply % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The local user's color in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
    #[default]
    Unknown,
}

impl PlayerColor {
    pub fn side(self) -> Option<Side> {
        match self {
            PlayerColor::White => Some(Side::White),
            PlayerColor::Black => Some(Side::Black),
            PlayerColor::Unknown => None,
        }
    }

    /// True when this player is the one to move. Unknown players never are.
    pub fn is_to_move(self, turn: Side) -> bool {
        self.side() == Some(turn)
    }

    /// Whether the board is drawn flipped for this player.
    pub fn is_flipped(self) -> bool {
        self == PlayerColor::Black
    }
}

impl From<Side> for PlayerColor {
    fn from(side: Side) -> Self {
        match side {
            Side::White => PlayerColor::White,
            Side::Black => PlayerColor::Black,
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerColor::White => f.write_str("white"),
            PlayerColor::Black => f.write_str("black"),
            PlayerColor::Unknown => f.write_str("unknown"),
        }
    }
}

impl FromStr for PlayerColor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(PlayerColor::White),
            "black" => Ok(PlayerColor::Black),
            "unknown" | "spectator" | "" => Ok(PlayerColor::Unknown),
            other => Err(DomainError::parse(format!("Unknown player color: {}", other))),
        }
    }
}
