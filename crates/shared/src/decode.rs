//! Inbound frame decoding.
//!
//! The server does not tag its frames; it sends JSON objects with any subset of
//! `historyMove`, `currentMove`, `move`, `ok`, `message`, `error`, `result` and
//! `event`. This module turns such an object into exactly one
//! [`ServerMessage`] using a fixed precedence:
//!
//! 1. a terminal `result` (anything non-empty other than `"0-0"`)
//! 2. `historyMove`
//! 3. `move`
//! 4. `ok`
//! 5. `event`
//! 6. `error`
//!
//! Anything else is [`ServerMessage::Unrecognized`]. The keepalive sentinel is
//! not JSON and must be filtered with [`is_keepalive`] before decoding.

use gambit_domain::{DomainError, GameOutcome, MoveNotation};
use serde::Deserialize;
use thiserror::Error;

use crate::messages::{GameEventKind, ServerMessage, KEEPALIVE_SENTINEL};

const DEFAULT_REJECT_REASON: &str = "move rejected";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid notation {value:?} in `{field}`: {source}")]
    Notation {
        field: &'static str,
        value: String,
        #[source]
        source: DomainError,
    },
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub message: ServerMessage,
    /// A `check`/`mate` event carried by the same frame but outranked by `message`.
    pub event: Option<GameEventKind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawServerFrame {
    history_move: Option<Vec<String>>,
    current_move: Option<usize>,
    #[serde(rename = "move")]
    move_: Option<String>,
    ok: Option<bool>,
    message: Option<String>,
    error: Option<String>,
    result: Option<String>,
    event: Option<String>,
}

/// True for the keepalive sentinel; such frames never reach the decoder.
pub fn is_keepalive(raw: &str) -> bool {
    raw.trim() == KEEPALIVE_SENTINEL
}

pub fn decode(raw: &str) -> Result<ServerMessage, DecodeError> {
    decode_frame(raw).map(|frame| frame.message)
}

pub fn decode_frame(raw: &str) -> Result<DecodedFrame, DecodeError> {
    let frame: RawServerFrame = serde_json::from_str(raw)?;

    let event = match frame.event.as_deref() {
        Some(value) => {
            let kind = GameEventKind::from_wire(value);
            if kind.is_none() {
                tracing::debug!(event = value, "Ignoring unknown game event");
            }
            kind
        }
        None => None,
    };

    let message = if let Some(outcome) = frame.result.as_deref().and_then(GameOutcome::from_wire) {
        ServerMessage::GameResult { outcome }
    } else if let Some(moves) = frame.history_move {
        let moves = moves
            .iter()
            .map(|value| parse_notation("historyMove", value))
            .collect::<Result<Vec<_>, _>>()?;
        ServerMessage::HistorySnapshot {
            moves,
            current_ply: frame.current_move,
        }
    } else if let Some(value) = frame.move_ {
        ServerMessage::OpponentMove {
            notation: parse_notation("move", &value)?,
        }
    } else if let Some(ok) = frame.ok {
        if ok {
            ServerMessage::Ack
        } else {
            let reason = non_empty(frame.message)
                .or_else(|| non_empty(frame.error))
                .unwrap_or_else(|| DEFAULT_REJECT_REASON.to_string());
            ServerMessage::Reject { reason }
        }
    } else if let Some(kind) = event {
        ServerMessage::GameEvent { kind }
    } else if let Some(message) = non_empty(frame.error) {
        ServerMessage::ServerError { message }
    } else {
        ServerMessage::Unrecognized
    };

    let event = match message {
        ServerMessage::GameEvent { .. } => None,
        _ => event,
    };

    Ok(DecodedFrame { message, event })
}

fn parse_notation(field: &'static str, value: &str) -> Result<MoveNotation, DecodeError> {
    value.parse().map_err(|source| DecodeError::Notation {
        field,
        value: value.to_string(),
        source,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
