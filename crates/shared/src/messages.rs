//! Message types exchanged over the game WebSocket.
//!
//! Outbound frames are plain text, not JSON: a move is sent as its compact
//! notation (`"e2e4"`, `"e7e8q"`) and the keepalive as the literal sentinel
//! `"0000"`. Inbound frames are JSON objects; see [`crate::decode`].

use std::fmt;

use gambit_domain::{GameOutcome, MoveNotation};
use serde::{Deserialize, Serialize};

/// No-op frame sent periodically by the client and ignored by both ends.
pub const KEEPALIVE_SENTINEL: &str = "0000";

// =============================================================================
// Client Messages (Player → Server)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Submit a move for the local player
    Move(MoveNotation),
    /// Keep the socket from idling out
    Keepalive,
}

impl ClientMessage {
    /// Text payload as it goes on the wire.
    pub fn to_wire(&self) -> String {
        match self {
            ClientMessage::Move(notation) => notation.to_string(),
            ClientMessage::Keepalive => KEEPALIVE_SENTINEL.to_string(),
        }
    }
}

// =============================================================================
// Server Messages (Server → Player)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameEventKind {
    Check,
    Mate,
}

impl GameEventKind {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "check" => Some(GameEventKind::Check),
            "mate" => Some(GameEventKind::Mate),
            _ => None,
        }
    }
}

impl fmt::Display for GameEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEventKind::Check => f.write_str("check"),
            GameEventKind::Mate => f.write_str("mate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Full authoritative move list, sent on join and after every accepted move
    HistorySnapshot {
        moves: Vec<MoveNotation>,
        /// Ply counter reported by the server, when present
        current_ply: Option<usize>,
    },
    /// The opponent played a move
    OpponentMove { notation: MoveNotation },
    /// Our last move was accepted
    Ack,
    /// Our last move was refused
    Reject { reason: String },
    /// Check or mate notification
    GameEvent { kind: GameEventKind },
    /// Terminal result of the game
    GameResult { outcome: GameOutcome },
    /// Stand-alone server error that is not tied to a move submission
    ServerError { message: String },
    /// Well-formed frame carrying nothing this client understands
    Unrecognized,
}

impl ServerMessage {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::HistorySnapshot { .. } => "history_snapshot",
            ServerMessage::OpponentMove { .. } => "opponent_move",
            ServerMessage::Ack => "ack",
            ServerMessage::Reject { .. } => "reject",
            ServerMessage::GameEvent { .. } => "game_event",
            ServerMessage::GameResult { .. } => "game_result",
            ServerMessage::ServerError { .. } => "server_error",
            ServerMessage::Unrecognized => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_frames_are_plain_text() {
        let m: MoveNotation = "e7e8q".parse().unwrap();
        assert_eq!(ClientMessage::Move(m).to_wire(), "e7e8q");
        assert_eq!(ClientMessage::Keepalive.to_wire(), "0000");
    }

    #[test]
    fn event_kinds_from_wire() {
        assert_eq!(GameEventKind::from_wire("check"), Some(GameEventKind::Check));
        assert_eq!(GameEventKind::from_wire("mate"), Some(GameEventKind::Mate));
        assert_eq!(GameEventKind::from_wire("stalemate"), None);
    }
}
