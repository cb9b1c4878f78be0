//! Connection state shared between the session task and its observers.

pub mod connection;

pub use connection::{set_connection_state, ConnectionState, ConnectionStateObserver};
