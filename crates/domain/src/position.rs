use std::fmt;

use serde::{Deserialize, Serialize};

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A full board state in FEN. Produced and consumed by the rules engine; the
/// session only stores and compares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    pub fn from_fen(fen: impl Into<String>) -> Self {
        Self(fen.into())
    }

    pub fn starting() -> Self {
        Self(STARTING_FEN.to_string())
    }

    pub fn as_fen(&self) -> &str {
        &self.0
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
