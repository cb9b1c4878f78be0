//! Session error taxonomy
//!
//! Connection-level failures (`ConnectTimeout`, `ConnectionLost`) end up as a
//! session-wide status; everything else is recovered from and at most shown as
//! a transient notice or returned to the caller of a submit.

use gambit_domain::GameStatus;
use gambit_shared::DecodeError;
use thiserror::Error;

use crate::infrastructure::websocket::ConnectionError;
use crate::ports::outbound::RulesError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Connect attempts kept timing out until the retry budget ran out
    #[error("Timed out connecting to the game server")]
    ConnectTimeout,
    /// The socket dropped and could not be re-established
    #[error("Connection to the game server lost after {attempts} reconnect attempts")]
    ConnectionLost { attempts: u32 },
    /// A frame could not be decoded; the connection is unaffected
    #[error("Could not decode server frame: {0}")]
    ProtocolDecode(String),
    /// The server refused our move; the optimistic update was rolled back
    #[error("Move rejected: {0}")]
    MoveRejected(String),
    /// A server move that does not fit the local history was discarded
    #[error("Out-of-order move discarded: {0}")]
    OutOfOrderMove(String),
    #[error("Not connected to the game server")]
    NotConnected,
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("Game is not in progress (status: {0})")]
    GameNotActive(GameStatus),
    #[error("Session has been closed")]
    SessionClosed,
    /// Writing to an open socket failed; the move was not sent
    #[error("Failed to send to the game server: {0}")]
    Transport(String),
}

impl SessionError {
    /// Fatal errors require a new session; everything else is recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::ConnectTimeout
                | SessionError::ConnectionLost { .. }
                | SessionError::SessionClosed
        )
    }
}

impl From<ConnectionError> for SessionError {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::ConnectTimeout => SessionError::ConnectTimeout,
            ConnectionError::ConnectionLost { attempts } => SessionError::ConnectionLost { attempts },
            ConnectionError::NotConnected => SessionError::NotConnected,
            ConnectionError::AbnormalClose { .. } | ConnectionError::Socket(_) => {
                SessionError::ConnectionLost { attempts: 0 }
            }
        }
    }
}

impl From<DecodeError> for SessionError {
    fn from(e: DecodeError) -> Self {
        SessionError::ProtocolDecode(e.to_string())
    }
}

impl From<RulesError> for SessionError {
    fn from(e: RulesError) -> Self {
        SessionError::IllegalMove(e.to_string())
    }
}
