//! WebSocket client for the game server
//!
//! - `core`: sans-IO connection state machine (timers, retry budget, keepalive)
//! - `client`: tokio-tungstenite transport
//! - `shared`: policy constants and socket URL construction

pub mod client;
pub mod core;
pub mod shared;

pub use self::core::{
    ConnectionEffect, ConnectionError, ConnectionMachine, ConnectionPolicy, TimerKind,
};
pub use client::{GameSocket, SocketEvent};
pub use shared::game_socket_url;
