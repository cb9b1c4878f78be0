//! Game lifecycle status, outcomes, and cold-load game metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::{PlayerColor, Side};
use crate::error::DomainError;
use crate::ids::UserId;
use crate::notation::MoveNotation;

/// The one `result` value that means "still in progress".
pub const IN_PROGRESS_RESULT: &str = "0-0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    #[default]
    Playing,
    Finished,
    Aborted,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Finished | GameStatus::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Playing => "playing",
            GameStatus::Finished => "finished",
            GameStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Ok(GameStatus::Waiting),
            "playing" | "in_progress" => Ok(GameStatus::Playing),
            "finished" => Ok(GameStatus::Finished),
            "aborted" => Ok(GameStatus::Aborted),
            other => Err(DomainError::parse(format!("Unknown game status: {}", other))),
        }
    }
}

/// Final result of a game as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
    /// Any other terminal value the server sends, kept verbatim.
    Other(String),
}

impl GameOutcome {
    /// Interpret a wire `result` value.
    ///
    /// Returns `None` for an empty value and for the in-progress sentinel `"0-0"`;
    /// every other value is terminal.
    pub fn from_wire(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() || value == IN_PROGRESS_RESULT {
            return None;
        }
        Some(match value {
            "1-0" => GameOutcome::WhiteWins,
            "0-1" => GameOutcome::BlackWins,
            "1/2-1/2" | "1-1" => GameOutcome::Draw,
            other => GameOutcome::Other(other.to_string()),
        })
    }

    pub fn as_wire(&self) -> &str {
        match self {
            GameOutcome::WhiteWins => "1-0",
            GameOutcome::BlackWins => "0-1",
            GameOutcome::Draw => "1/2-1/2",
            GameOutcome::Other(value) => value,
        }
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            GameOutcome::WhiteWins => Some(Side::White),
            GameOutcome::BlackWins => Some(Side::Black),
            GameOutcome::Draw | GameOutcome::Other(_) => None,
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Game metadata from the REST cold-load (`GET /chess/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub white_user_id: UserId,
    pub black_user_id: UserId,
    pub status: GameStatus,
    #[serde(default)]
    pub result: Option<String>,
    /// Moves played so far, oldest first.
    #[serde(default)]
    pub history_move: Vec<MoveNotation>,
}

impl GameInfo {
    /// Which color `user` plays in this game; anyone else is a spectator.
    pub fn color_of(&self, user: &UserId) -> PlayerColor {
        if *user == self.white_user_id {
            PlayerColor::White
        } else if *user == self.black_user_id {
            PlayerColor::Black
        } else {
            PlayerColor::Unknown
        }
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.result.as_deref().and_then(GameOutcome::from_wire)
    }
}
