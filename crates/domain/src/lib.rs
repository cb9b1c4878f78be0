//! Gambit domain layer.
//!
//! Pure value types for a client-side game session: who plays which side, whose
//! turn it is, how board cells map to wire notation, and the append-only move
//! history. Nothing in here performs I/O or knows about sockets; legality of
//! moves is delegated to a rules engine behind a port in the player crate.

extern crate self as gambit_domain;

pub mod board;
pub mod color;
pub mod error;
pub mod game;
pub mod history;
pub mod ids;
pub mod notation;
pub mod position;

pub use board::{from_notation, to_notation, BoardCell, Square, BOARD_SIZE};
pub use color::{PlayerColor, Side};
pub use error::DomainError;
pub use game::{GameInfo, GameOutcome, GameStatus, IN_PROGRESS_RESULT};
pub use history::{Move, MoveHistory};
pub use ids::{GameId, UserId};
pub use notation::{MoveNotation, Promotion};
pub use position::Position;
