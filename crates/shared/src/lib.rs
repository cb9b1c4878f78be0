//! Gambit Protocol - wire types between the game server and the Player client
//!
//! This crate contains everything that crosses the game WebSocket:
//! - Outbound frames (`ClientMessage`): a move in compact notation, or the keepalive sentinel
//! - Inbound frames (`ServerMessage`): the tagged union the client reducer consumes
//! - The precedence decoder that turns a loosely-shaped JSON frame into one `ServerMessage`
//!
//! # Design Principles
//!
//! 1. **No session logic** - decoding is pure; what a message *means* for the game
//!    is decided by the player crate's reducer
//! 2. **Fixed precedence** - a frame carrying several fields always decodes the same way
//! 3. **Recoverable failures** - a malformed frame is a `DecodeError`, never a panic

pub mod decode;
pub mod messages;

pub use decode::{decode, decode_frame, is_keepalive, DecodeError, DecodedFrame};
pub use messages::{ClientMessage, GameEventKind, ServerMessage, KEEPALIVE_SENTINEL};
