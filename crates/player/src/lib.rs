//! Client-side game session engine.
//!
//! Keeps one live game in sync with the server over a WebSocket: connection
//! lifecycle with bounded reconnects and keepalive, a pure reducer for server
//! messages and local move submission, and history browsing that never
//! touches the live position.

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;
pub mod session_context;

pub use application::session::{ActiveGame, SessionHandle, SessionService, SessionView};
pub use application::SessionError;
pub use config::ClientConfig;
pub use infrastructure::{ChessRulesEngine, ConnectionState, ConnectionStateObserver, StaticTokenAuth};
pub use session_context::SessionContext;
