//! Compact move notation: `from` + `to` squares and an optional promotion
//! piece, e.g. `"e2e4"` or `"e7e8q"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::{BoardCell, Square};
use crate::color::PlayerColor;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    pub fn as_char(self) -> char {
        match self {
            Promotion::Queen => 'q',
            Promotion::Rook => 'r',
            Promotion::Bishop => 'b',
            Promotion::Knight => 'n',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'q' => Some(Promotion::Queen),
            'r' => Some(Promotion::Rook),
            'b' => Some(Promotion::Bishop),
            'n' => Some(Promotion::Knight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MoveNotation {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

impl MoveNotation {
    pub fn new(from: Square, to: Square, promotion: Option<Promotion>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }

    /// Encode a move the user made between two screen cells.
    pub fn from_cells(
        from: BoardCell,
        to: BoardCell,
        promotion: Option<Promotion>,
        viewer: PlayerColor,
    ) -> Self {
        Self::new(from.to_square(viewer), to.to_square(viewer), promotion)
    }

    /// Screen cells `(from, to)` for this move as drawn for `viewer`.
    pub fn to_cells(&self, viewer: PlayerColor) -> (BoardCell, BoardCell) {
        (self.from.to_cell(viewer), self.to.to_cell(viewer))
    }
}

impl fmt::Display for MoveNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for MoveNotation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(DomainError::parse(format!("bad move notation: {:?}", s)));
        }
        let from: Square = s[0..2].parse()?;
        let to: Square = s[2..4].parse()?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(c) => Some(Promotion::from_char(c).ok_or_else(|| {
                DomainError::parse(format!("bad promotion piece in {:?}", s))
            })?),
        };
        Ok(Self::new(from, to, promotion))
    }
}

impl TryFrom<String> for MoveNotation {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MoveNotation> for String {
    fn from(value: MoveNotation) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_promotion_moves() {
        let m: MoveNotation = "e2e4".parse().unwrap();
        assert_eq!(m.from.to_string(), "e2");
        assert_eq!(m.to.to_string(), "e4");
        assert_eq!(m.promotion, None);

        let p: MoveNotation = "e7e8q".parse().unwrap();
        assert_eq!(p.promotion, Some(Promotion::Queen));
        assert_eq!(p.to_string(), "e7e8q");
    }

    #[test]
    fn rejects_malformed_notation() {
        for bad in ["", "e2", "e2e", "e2e4qq", "e2e9", "e2e8k", "é2e4"] {
            assert!(bad.parse::<MoveNotation>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn black_cells_encode_to_absolute_notation() {
        let from = BoardCell::new(1, 3).unwrap();
        let to = BoardCell::new(3, 3).unwrap();
        let m = MoveNotation::from_cells(from, to, None, PlayerColor::Black);
        assert_eq!(m.to_string(), "e2e4");
        assert_eq!(m.to_cells(PlayerColor::Black), (from, to));
    }

    #[test]
    fn serializes_as_plain_string() {
        let m: MoveNotation = "g1f3".parse().unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"g1f3\"");
        let back: MoveNotation = serde_json::from_str("\"g1f3\"").unwrap();
        assert_eq!(back, m);
    }
}
