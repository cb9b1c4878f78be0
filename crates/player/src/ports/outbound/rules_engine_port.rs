//! Rules Engine Port - legality checks and position derivation
//!
//! The session never interprets piece placement itself. Every position it holds
//! was produced by this port, either from the initial position or by applying a
//! move to an earlier one.

use gambit_domain::{MoveNotation, Position};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Illegal move {notation} in position {position}")]
    IllegalMove {
        notation: MoveNotation,
        position: Position,
    },
}

/// Port for the chess rules library.
///
/// Implementations must be deterministic: applying the same move to the same
/// position always yields the same result, which is what makes history replay
/// reproduce the live position.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait RulesEnginePort: Send + Sync {
    /// Position before any move has been played.
    fn initial_position(&self) -> Position;

    /// Apply `notation` to `position`, failing if the move is not legal there.
    fn apply(&self, position: &Position, notation: &MoveNotation) -> Result<Position, RulesError>;

    /// Whether the side to move in `position` is in check.
    fn is_check(&self, position: &Position) -> bool;
}
