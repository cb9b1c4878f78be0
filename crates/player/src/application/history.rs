//! History navigator.
//!
//! Derives browsable positions by replaying the move history from the initial
//! position through the rules engine. Nothing here mutates the history or the
//! live position; callers get a fresh [`ViewState`] back.

use gambit_domain::{MoveHistory, MoveNotation, Position};

use crate::application::session::ViewState;
use crate::ports::outbound::RulesEnginePort;

/// Position after playing `moves` from the initial position.
///
/// A move the rules engine refuses is skipped and logged; the history is
/// server-authoritative, so one bad entry must not hide everything after it.
pub fn replay(rules: &dyn RulesEnginePort, moves: &[MoveNotation]) -> Position {
    let mut position = rules.initial_position();
    for (ply, notation) in moves.iter().enumerate() {
        match rules.apply(&position, notation) {
            Ok(next) => position = next,
            Err(e) => {
                tracing::warn!(ply, notation = %notation, error = %e, "Skipping unreplayable move");
            }
        }
    }
    position
}

/// Valid range for `viewed_index` given `history`: `-1..=len-1`.
pub fn clamp_index(history: &MoveHistory, index: isize) -> isize {
    index.clamp(-1, history.len() as isize - 1)
}

/// View of the position after move `index` (`-1` = before any move).
/// Out-of-range indices are clamped.
pub fn view_at(rules: &dyn RulesEnginePort, history: &MoveHistory, index: isize) -> ViewState {
    let index = clamp_index(history, index);
    let notations = history.notations();
    let upto = (index + 1) as usize;
    let position = replay(rules, &notations[..upto]);
    ViewState {
        viewed_index: index,
        in_check: rules.is_check(&position),
        position,
    }
}

pub fn step_back(rules: &dyn RulesEnginePort, history: &MoveHistory, view: &ViewState) -> ViewState {
    if view.viewed_index <= -1 {
        return view.clone();
    }
    view_at(rules, history, view.viewed_index - 1)
}

pub fn step_forward(
    rules: &dyn RulesEnginePort,
    history: &MoveHistory,
    view: &ViewState,
) -> ViewState {
    if view.viewed_index >= history.len() as isize - 1 {
        return view.clone();
    }
    view_at(rules, history, view.viewed_index + 1)
}

pub fn jump_to(rules: &dyn RulesEnginePort, history: &MoveHistory, index: isize) -> ViewState {
    view_at(rules, history, index)
}
