pub mod auth;
pub mod messaging;
pub mod rules;
pub mod websocket;

// Re-export commonly used adapters
pub use auth::StaticTokenAuth;
pub use messaging::{ConnectionState, ConnectionStateObserver};
pub use rules::ChessRulesEngine;
