//! Rules engine adapters.

mod chess_rules;

pub use chess_rules::ChessRulesEngine;
