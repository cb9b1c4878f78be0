//! Player port definitions.
//!
//! Outbound ports are the seams to external collaborators the session engine
//! consumes but does not implement: move legality/position derivation and
//! token storage/refresh.

pub mod outbound;
