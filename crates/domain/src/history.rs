//! Append-only move history with a single optimistic slot.
//!
//! Committed moves are never mutated or removed. A locally submitted move sits
//! in the pending slot until the server acknowledges it (commit) or rejects it
//! (revert). The pending move counts toward [`MoveHistory::len`], so turn
//! parity and the browsable range already include it.

use serde::{Deserialize, Serialize};

use crate::color::Side;
use crate::error::DomainError;
use crate::notation::MoveNotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub ply: usize,
    pub notation: MoveNotation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveHistory {
    committed: Vec<Move>,
    pending: Option<Move>,
}

impl MoveHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history wholesale from a server snapshot. Everything is committed.
    pub fn from_snapshot(moves: impl IntoIterator<Item = MoveNotation>) -> Self {
        let committed = moves
            .into_iter()
            .enumerate()
            .map(|(ply, notation)| Move { ply, notation })
            .collect();
        Self {
            committed,
            pending: None,
        }
    }

    /// Number of moves including the pending one.
    pub fn len(&self) -> usize {
        self.committed.len() + usize::from(self.pending.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }

    pub fn pending(&self) -> Option<&Move> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Side to move after every recorded move, pending included.
    pub fn side_to_move(&self) -> Side {
        Side::for_ply(self.len())
    }

    pub fn get(&self, index: usize) -> Option<&Move> {
        if index < self.committed.len() {
            self.committed.get(index)
        } else if index == self.committed.len() {
            self.pending.as_ref()
        } else {
            None
        }
    }

    pub fn last(&self) -> Option<&Move> {
        self.pending.as_ref().or_else(|| self.committed.last())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.committed.iter().chain(self.pending.iter())
    }

    pub fn notations(&self) -> Vec<MoveNotation> {
        self.iter().map(|m| m.notation).collect()
    }

    /// Append a server-confirmed move. Fails while a pending move is outstanding.
    pub fn push_committed(&mut self, notation: MoveNotation) -> Result<&Move, DomainError> {
        if self.pending.is_some() {
            return Err(DomainError::constraint(
                "cannot commit a server move while a local move is pending",
            ));
        }
        let ply = self.committed.len();
        self.committed.push(Move { ply, notation });
        Ok(&self.committed[ply])
    }

    /// Record a locally submitted move awaiting server confirmation.
    pub fn push_pending(&mut self, notation: MoveNotation) -> Result<&Move, DomainError> {
        if self.pending.is_some() {
            return Err(DomainError::constraint("a move is already pending"));
        }
        let pending = self.pending.insert(Move {
            ply: self.committed.len(),
            notation,
        });
        Ok(pending)
    }

    pub fn commit_pending(&mut self) -> Option<Move> {
        let pending = self.pending.take()?;
        self.committed.push(pending);
        Some(pending)
    }

    pub fn revert_pending(&mut self) -> Option<Move> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> MoveNotation {
        s.parse().unwrap()
    }

    #[test]
    fn ply_matches_position() {
        let history = MoveHistory::from_snapshot([mv("e2e4"), mv("e7e5"), mv("g1f3")]);
        for (index, m) in history.iter().enumerate() {
            assert_eq!(m.ply, index);
        }
        assert_eq!(history.side_to_move(), Side::Black);
    }

    #[test]
    fn pending_counts_toward_length_and_turn() {
        let mut history = MoveHistory::from_snapshot([mv("e2e4")]);
        history.push_pending(mv("e7e5")).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.committed_len(), 1);
        assert_eq!(history.side_to_move(), Side::White);
        assert_eq!(history.last().unwrap().notation, mv("e7e5"));
    }

    #[test]
    fn revert_restores_pre_submit_length() {
        let mut history = MoveHistory::from_snapshot([mv("e2e4"), mv("e7e5")]);
        history.push_pending(mv("g1f3")).unwrap();

        let reverted = history.revert_pending().unwrap();
        assert_eq!(reverted.notation, mv("g1f3"));
        assert_eq!(history.len(), 2);
        assert!(!history.has_pending());
    }

    #[test]
    fn commit_keeps_the_move() {
        let mut history = MoveHistory::new();
        history.push_pending(mv("d2d4")).unwrap();
        history.commit_pending().unwrap();

        assert_eq!(history.committed_len(), 1);
        assert_eq!(history.get(0).unwrap().notation, mv("d2d4"));
        assert!(history.commit_pending().is_none());
    }

    #[test]
    fn single_pending_slot() {
        let mut history = MoveHistory::new();
        history.push_pending(mv("d2d4")).unwrap();

        assert!(history.push_pending(mv("e2e4")).is_err());
        assert!(history.push_committed(mv("d7d5")).is_err());
        assert_eq!(history.len(), 1);
    }
}
