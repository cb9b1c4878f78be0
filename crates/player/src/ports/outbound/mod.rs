//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing the session engine to interact with external systems without
//! depending on concrete implementations.

pub mod auth_port;
pub mod rules_engine_port;

pub use auth_port::AuthPort;
pub use rules_engine_port::{RulesEnginePort, RulesError};

#[cfg(any(test, feature = "testing"))]
pub use auth_port::MockAuthPort;
#[cfg(any(test, feature = "testing"))]
pub use rules_engine_port::MockRulesEnginePort;
