//! Client-side game session state and the snapshot published to renderers.

use gambit_domain::{
    GameId, GameOutcome, GameStatus, MoveHistory, MoveNotation, PlayerColor, Position, Side,
};
use serde::Serialize;

use crate::application::error::SessionError;
use crate::application::history;
use crate::infrastructure::messaging::ConnectionState;
use crate::ports::outbound::RulesEnginePort;
use crate::session_context::SessionContext;

/// What the user is currently looking at. Decoupled from the live position so
/// browsing history never affects move submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// `-1` is the initial position; `len - 1` is the live end.
    pub viewed_index: isize,
    pub position: Position,
    /// Side to move in the viewed position is in check.
    pub in_check: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    pub game_id: GameId,
    pub self_color: PlayerColor,
    pub current_turn: Side,
    pub status: GameStatus,
    pub result: Option<GameOutcome>,
    pub connection: ConnectionState,
    /// Set once the connection has failed for good.
    pub connection_error: Option<SessionError>,
    pub history: MoveHistory,
    pub live_position: Position,
    /// Live position before the pending move, restored on reject.
    pub(crate) pending_base: Option<Position>,
    pub view: ViewState,
    /// Transient check highlight from the server.
    pub in_check: bool,
    pub mated: bool,
    /// Transient message (rejections, server errors).
    pub notice: Option<String>,
}

impl GameSession {
    /// Session seeded from the cold-loaded game: its moves replace the history
    /// wholesale, exactly like a server snapshot.
    pub fn new(ctx: &SessionContext, rules: &dyn RulesEnginePort) -> Self {
        let history = MoveHistory::from_snapshot(ctx.initial_moves.iter().copied());
        let live_position = history::replay(rules, &ctx.initial_moves);
        let mut session = Self {
            game_id: ctx.game_id,
            self_color: ctx.self_color,
            current_turn: history.side_to_move(),
            status: ctx.initial_status,
            result: ctx.initial_result.clone(),
            connection: ConnectionState::Idle,
            connection_error: None,
            history,
            view: ViewState {
                viewed_index: -1,
                position: live_position.clone(),
                in_check: false,
            },
            live_position,
            pending_base: None,
            in_check: false,
            mated: false,
            notice: None,
        };
        session.view = session.live_view(rules);
        session
    }

    pub fn live_index(&self) -> isize {
        self.history.len() as isize - 1
    }

    pub fn is_viewing_live(&self) -> bool {
        self.view.viewed_index == self.live_index()
    }

    /// View pinned to the live end of the history.
    pub fn live_view(&self, rules: &dyn RulesEnginePort) -> ViewState {
        ViewState {
            viewed_index: self.live_index(),
            position: self.live_position.clone(),
            in_check: rules.is_check(&self.live_position),
        }
    }

    /// Every precondition for submitting a move holds.
    pub fn can_submit(&self) -> bool {
        self.connection.is_open()
            && self.status == GameStatus::Playing
            && self.self_color.is_to_move(self.current_turn)
    }
}

/// Read-only snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub game_id: GameId,
    pub self_color: PlayerColor,
    pub current_turn: Side,
    pub status: GameStatus,
    pub result: Option<GameOutcome>,
    pub connection: ConnectionState,
    pub fatal_error: Option<String>,
    pub moves: Vec<MoveNotation>,
    pub pending_move: Option<MoveNotation>,
    pub live_position: Position,
    pub viewed_index: isize,
    pub viewed_position: Position,
    pub viewed_in_check: bool,
    pub viewing_live: bool,
    pub in_check: bool,
    pub mated: bool,
    pub notice: Option<String>,
    pub can_submit: bool,
}

impl From<&GameSession> for SessionView {
    fn from(session: &GameSession) -> Self {
        Self {
            game_id: session.game_id,
            self_color: session.self_color,
            current_turn: session.current_turn,
            status: session.status,
            result: session.result.clone(),
            connection: session.connection,
            fatal_error: session.connection_error.as_ref().map(|e| e.to_string()),
            moves: session.history.notations(),
            pending_move: session.history.pending().map(|m| m.notation),
            live_position: session.live_position.clone(),
            viewed_index: session.view.viewed_index,
            viewed_position: session.view.position.clone(),
            viewed_in_check: session.view.in_check,
            viewing_live: session.is_viewing_live(),
            in_check: session.in_check,
            mated: session.mated,
            notice: session.notice.clone(),
            can_submit: session.can_submit(),
        }
    }
}
