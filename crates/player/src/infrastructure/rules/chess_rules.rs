//! `RulesEnginePort` backed by the `chess` crate.
//!
//! Positions travel as FEN strings; each call parses the board, so the adapter
//! itself is stateless and can be shared freely.

use std::str::FromStr;

use chess::{Board, ChessMove, File, MoveGen, Piece, Rank, Square};
use gambit_domain::{MoveNotation, Position, Promotion};

use crate::ports::outbound::{RulesEnginePort, RulesError};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRulesEngine;

impl ChessRulesEngine {
    pub fn new() -> Self {
        Self
    }

    fn board(position: &Position) -> Result<Board, RulesError> {
        Board::from_str(position.as_fen())
            .map_err(|e| RulesError::InvalidPosition(format!("{}: {}", position, e)))
    }

    fn to_chess_move(notation: &MoveNotation) -> ChessMove {
        let square = |sq: gambit_domain::Square| {
            Square::make_square(
                Rank::from_index(sq.rank() as usize),
                File::from_index(sq.file() as usize),
            )
        };
        let promotion = notation.promotion.map(|p| match p {
            Promotion::Queen => Piece::Queen,
            Promotion::Rook => Piece::Rook,
            Promotion::Bishop => Piece::Bishop,
            Promotion::Knight => Piece::Knight,
        });
        ChessMove::new(square(notation.from), square(notation.to), promotion)
    }
}

impl RulesEnginePort for ChessRulesEngine {
    fn initial_position(&self) -> Position {
        Position::from_fen(Board::default().to_string())
    }

    fn apply(&self, position: &Position, notation: &MoveNotation) -> Result<Position, RulesError> {
        let board = Self::board(position)?;
        let chess_move = Self::to_chess_move(notation);

        if !MoveGen::new_legal(&board).any(|m| m == chess_move) {
            return Err(RulesError::IllegalMove {
                notation: *notation,
                position: position.clone(),
            });
        }

        Ok(Position::from_fen(board.make_move_new(chess_move).to_string()))
    }

    fn is_check(&self, position: &Position) -> bool {
        match Self::board(position) {
            Ok(board) => board.checkers().popcnt() > 0,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot evaluate check on unparseable position");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> MoveNotation {
        s.parse().unwrap()
    }

    fn play(engine: &ChessRulesEngine, moves: &[&str]) -> Position {
        moves.iter().fold(engine.initial_position(), |position, m| {
            engine.apply(&position, &mv(m)).unwrap()
        })
    }

    #[test]
    fn initial_position_is_the_standard_start() {
        let engine = ChessRulesEngine::new();
        let initial = Board::from_str(engine.initial_position().as_fen()).unwrap();
        let starting = Board::from_str(Position::starting().as_fen()).unwrap();
        assert_eq!(initial, Board::default());
        assert_eq!(starting, Board::default());
    }

    #[test]
    fn applies_legal_moves() {
        let engine = ChessRulesEngine::new();
        let position = play(&engine, &["e2e4", "e7e5", "g1f3"]);
        assert!(position.as_fen().starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b"));
    }

    #[test]
    fn rejects_illegal_moves() {
        let engine = ChessRulesEngine::new();
        let start = engine.initial_position();

        let err = engine.apply(&start, &mv("e2e5")).unwrap_err();
        assert!(matches!(err, RulesError::IllegalMove { .. }));
        // Black cannot move first.
        assert!(engine.apply(&start, &mv("e7e5")).is_err());
    }

    #[test]
    fn detects_check() {
        let engine = ChessRulesEngine::new();
        let position = play(&engine, &["f2f3", "e7e5", "g2g4"]);
        assert!(!engine.is_check(&position));

        let mated = engine.apply(&position, &mv("d8h4")).unwrap();
        assert!(engine.is_check(&mated));
    }

    #[test]
    fn promotion_requires_piece() {
        let engine = ChessRulesEngine::new();
        let position = Position::from_fen("8/4P3/8/8/8/8/k7/7K w - - 0 1");

        assert!(engine.apply(&position, &mv("e7e8")).is_err());
        let promoted = engine.apply(&position, &mv("e7e8q")).unwrap();
        assert!(promoted.as_fen().starts_with("4Q3/"));
    }

    #[test]
    fn invalid_fen_is_reported() {
        let engine = ChessRulesEngine::new();
        let garbage = Position::from_fen("not a fen");
        assert!(matches!(
            engine.apply(&garbage, &mv("e2e4")),
            Err(RulesError::InvalidPosition(_))
        ));
        assert!(!engine.is_check(&garbage));
    }
}
