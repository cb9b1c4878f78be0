//! Game session reducer.
//!
//! Pure transitions from one [`GameSession`] to the next. No I/O, no clocks:
//! anything that must happen outside the session (stopping the keepalive,
//! arming a display timer, logging a discarded message) is returned as a
//! [`ReducerEffect`] for the session task to carry out.
//!
//! The move history only ever grows by one committed move, gains or loses the
//! single pending move, or is replaced wholesale by a server snapshot. No path
//! rewrites a committed move.

use gambit_domain::{
    BoardCell, GameOutcome, GameStatus, MoveHistory, MoveNotation, Promotion, Side,
};
use gambit_shared::{ClientMessage, GameEventKind, ServerMessage};

use super::state::GameSession;
use crate::application::error::SessionError;
use crate::application::history;
use crate::infrastructure::messaging::ConnectionState;
use crate::ports::outbound::RulesEnginePort;

/// Server error text that means the game has already ended.
const GAME_OVER_REASON: &str = "game is over";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReducerEffect {
    /// The game is over; no more keepalives.
    StopKeepalive,
    /// Clear `in_check` after the check display duration.
    ArmCheckClear,
    /// Clear `notice` after the notice display duration.
    ArmNoticeClear,
    /// A recoverable problem was handled; report it.
    Recovered(SessionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: GameSession,
    pub effects: Vec<ReducerEffect>,
}

impl Transition {
    fn discard(session: &GameSession, error: SessionError) -> Self {
        Self {
            session: session.clone(),
            effects: vec![ReducerEffect::Recovered(error)],
        }
    }
}

/// A validated local move, ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub session: GameSession,
    pub notation: MoveNotation,
    pub message: ClientMessage,
}

/// Apply one decoded server message.
pub fn apply(
    session: &GameSession,
    message: &ServerMessage,
    rules: &dyn RulesEnginePort,
) -> Transition {
    let mut next = session.clone();
    let mut effects = Vec::new();

    match message {
        ServerMessage::HistorySnapshot { moves, current_ply } => {
            apply_snapshot(&mut next, moves, *current_ply, rules, &mut effects);
        }
        ServerMessage::OpponentMove { notation } => {
            if let Err(e) = apply_opponent_move(&mut next, notation, rules) {
                return Transition::discard(session, e);
            }
        }
        ServerMessage::Ack => {
            next.history.commit_pending();
            next.pending_base = None;
        }
        ServerMessage::Reject { reason } => {
            apply_reject(&mut next, reason, rules, &mut effects);
        }
        ServerMessage::GameEvent {
            kind: GameEventKind::Check,
        } => {
            next.in_check = true;
            effects.push(ReducerEffect::ArmCheckClear);
        }
        ServerMessage::GameEvent {
            kind: GameEventKind::Mate,
        } => {
            next.mated = true;
            // The side to move is the one that got mated.
            let outcome = match next.current_turn {
                Side::White => GameOutcome::BlackWins,
                Side::Black => GameOutcome::WhiteWins,
            };
            finish(&mut next, Some(outcome), &mut effects);
        }
        ServerMessage::GameResult { outcome } => {
            finish(&mut next, Some(outcome.clone()), &mut effects);
        }
        ServerMessage::ServerError { message } => {
            next.notice = Some(message.clone());
            effects.push(ReducerEffect::ArmNoticeClear);
        }
        ServerMessage::Unrecognized => {}
    }

    Transition {
        session: next,
        effects,
    }
}

fn apply_snapshot(
    session: &mut GameSession,
    moves: &[MoveNotation],
    current_ply: Option<usize>,
    rules: &dyn RulesEnginePort,
    effects: &mut Vec<ReducerEffect>,
) {
    session.history = MoveHistory::from_snapshot(moves.iter().copied());
    session.pending_base = None;
    session.live_position = history::replay(rules, moves);

    if let Some(ply) = current_ply.filter(|ply| *ply != moves.len()) {
        effects.push(ReducerEffect::Recovered(SessionError::OutOfOrderMove(format!(
            "snapshot reports ply {} but carries {} moves",
            ply,
            moves.len()
        ))));
    }
    // Turn follows the moves actually held, never the reported ply.
    session.current_turn = session.history.side_to_move();

    if session.status == GameStatus::Waiting {
        session.status = GameStatus::Playing;
    }
    session.view = session.live_view(rules);
}

fn apply_opponent_move(
    session: &mut GameSession,
    notation: &MoveNotation,
    rules: &dyn RulesEnginePort,
) -> Result<(), SessionError> {
    if !session.connection.is_open() {
        return Err(SessionError::OutOfOrderMove(format!(
            "{} arrived while the connection is {}",
            notation, session.connection
        )));
    }
    if session.self_color.is_to_move(session.current_turn) {
        return Err(SessionError::OutOfOrderMove(format!(
            "{} arrived at ply {} on our own turn",
            notation,
            session.history.len()
        )));
    }
    let position = rules.apply(&session.live_position, notation).map_err(|e| {
        SessionError::OutOfOrderMove(format!("{} at ply {}: {}", notation, session.history.len(), e))
    })?;

    let was_live = session.is_viewing_live();

    // The opponent could only move if the server accepted our pending move.
    session.history.commit_pending();
    session.pending_base = None;
    session
        .history
        .push_committed(*notation)
        .map_err(|e| SessionError::OutOfOrderMove(e.to_string()))?;
    session.live_position = position;
    session.current_turn = session.history.side_to_move();
    if session.status == GameStatus::Waiting {
        session.status = GameStatus::Playing;
    }

    if was_live {
        session.view = session.live_view(rules);
    }
    Ok(())
}

fn apply_reject(
    session: &mut GameSession,
    reason: &str,
    rules: &dyn RulesEnginePort,
    effects: &mut Vec<ReducerEffect>,
) {
    let was_live = session.is_viewing_live();

    if session.history.revert_pending().is_some() {
        if let Some(base) = session.pending_base.take() {
            session.live_position = base;
        }
        session.current_turn = session.history.side_to_move();
        if was_live || session.view.viewed_index > session.live_index() {
            session.view = session.live_view(rules);
        }
    }

    session.notice = Some(reason.to_string());
    effects.push(ReducerEffect::ArmNoticeClear);
    effects.push(ReducerEffect::Recovered(SessionError::MoveRejected(
        reason.to_string(),
    )));

    if reason.to_ascii_lowercase().contains(GAME_OVER_REASON) {
        finish(session, None, effects);
    }
}

fn finish(
    session: &mut GameSession,
    outcome: Option<GameOutcome>,
    effects: &mut Vec<ReducerEffect>,
) {
    // A result implies the server took our last move.
    session.history.commit_pending();
    session.pending_base = None;
    session.status = GameStatus::Finished;
    if outcome.is_some() {
        session.result = outcome;
    }
    if !effects.contains(&ReducerEffect::StopKeepalive) {
        effects.push(ReducerEffect::StopKeepalive);
    }
}

/// Validate and optimistically apply a local move made between two board cells.
///
/// On success the move is pending in the history, the turn has flipped and the
/// returned message is ready to send. On failure the session is untouched.
pub fn submit(
    session: &GameSession,
    from: BoardCell,
    to: BoardCell,
    promotion: Option<Promotion>,
    rules: &dyn RulesEnginePort,
) -> Result<Submission, SessionError> {
    if !session.connection.is_open() {
        return Err(SessionError::NotConnected);
    }
    if session.status != GameStatus::Playing {
        return Err(SessionError::GameNotActive(session.status));
    }
    if !session.self_color.is_to_move(session.current_turn) {
        return Err(SessionError::NotYourTurn);
    }

    let notation = MoveNotation::from_cells(from, to, promotion, session.self_color);
    let position = rules.apply(&session.live_position, &notation)?;

    let mut next = session.clone();
    let was_live = next.is_viewing_live();
    next.history
        .push_pending(notation)
        .map_err(|_| SessionError::NotYourTurn)?;
    next.pending_base = Some(std::mem::replace(&mut next.live_position, position));
    next.current_turn = next.history.side_to_move();
    if was_live {
        next.view = next.live_view(rules);
    }

    Ok(Submission {
        session: next,
        notation,
        message: ClientMessage::Move(notation),
    })
}

pub fn connection_changed(session: &GameSession, state: ConnectionState) -> GameSession {
    let mut next = session.clone();
    next.connection = state;
    next
}

pub fn connection_failed(session: &GameSession, error: SessionError) -> GameSession {
    let mut next = session.clone();
    next.connection_error = Some(error);
    next
}

pub fn clear_check(session: &GameSession) -> GameSession {
    let mut next = session.clone();
    next.in_check = false;
    next
}

pub fn clear_notice(session: &GameSession) -> GameSession {
    let mut next = session.clone();
    next.notice = None;
    next
}
