//! Explicit per-session context.
//!
//! Built once by the composition root and handed to the session service, so
//! nothing downstream reads credentials or identifiers from ambient storage.

use gambit_domain::{GameId, GameInfo, GameOutcome, GameStatus, MoveNotation, PlayerColor, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub game_id: GameId,
    pub user_id: Option<UserId>,
    pub self_color: PlayerColor,
    /// Status from the cold-load metadata; a finished or aborted game never opens a socket.
    pub initial_status: GameStatus,
    /// Cold-loaded moves; the session starts from them as if from a snapshot.
    pub initial_moves: Vec<MoveNotation>,
    pub initial_result: Option<GameOutcome>,
}

impl SessionContext {
    pub fn new(game_id: GameId, self_color: PlayerColor) -> Self {
        Self {
            game_id,
            user_id: None,
            self_color,
            initial_status: GameStatus::Playing,
            initial_moves: Vec::new(),
            initial_result: None,
        }
    }

    /// Resolve the local player's color from cold-loaded game metadata.
    pub fn from_game_info(game_id: GameId, user_id: UserId, info: &GameInfo) -> Self {
        Self {
            game_id,
            user_id: Some(user_id),
            self_color: info.color_of(&user_id),
            initial_status: info.status,
            initial_moves: info.history_move.clone(),
            initial_result: info.outcome(),
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: GameStatus) -> Self {
        self.initial_status = status;
        self
    }

    pub fn with_history(mut self, moves: Vec<MoveNotation>) -> Self {
        self.initial_moves = moves;
        self
    }

    pub fn with_result(mut self, result: Option<GameOutcome>) -> Self {
        self.initial_result = result;
        self
    }

    pub fn should_connect(&self) -> bool {
        !self.initial_status.is_over()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_color_and_status_from_game_info() {
        let me = UserId::new();
        let info = GameInfo {
            white_user_id: UserId::new(),
            black_user_id: me,
            status: GameStatus::Waiting,
            result: None,
            history_move: Vec::new(),
        };

        let ctx = SessionContext::from_game_info(GameId::new(), me, &info);
        assert_eq!(ctx.self_color, PlayerColor::Black);
        assert_eq!(ctx.initial_status, GameStatus::Waiting);
        assert!(ctx.should_connect());
    }

    #[test]
    fn carries_cold_loaded_result_and_history() {
        let me = UserId::new();
        let info = GameInfo {
            white_user_id: me,
            black_user_id: UserId::new(),
            status: GameStatus::Finished,
            result: Some("1-0".to_string()),
            history_move: vec!["e2e4".parse().unwrap(), "e7e5".parse().unwrap()],
        };

        let ctx = SessionContext::from_game_info(GameId::new(), me, &info);
        assert_eq!(ctx.initial_result, Some(GameOutcome::WhiteWins));
        assert_eq!(ctx.initial_moves, info.history_move);
        assert!(!ctx.should_connect());
    }

    #[test]
    fn finished_games_do_not_connect() {
        let ctx = SessionContext::new(GameId::new(), PlayerColor::White)
            .with_status(GameStatus::Finished);
        assert!(!ctx.should_connect());
    }
}
