//! Board coordinates and the orientation-aware notation codec.
//!
//! Two coordinate systems meet here:
//!
//! - [`Square`] is absolute and white-relative: file `a..h`, rank `1..8`. This is
//!   what travels on the wire.
//! - [`BoardCell`] is what the user touched on screen: `row` counts down from
//!   the top edge of the drawn board and `col` counts right from its left edge.
//!
//! For a white viewer the drawn board has rank 8 on top and file `a` on the
//! left, so `(row, col)` maps to file `col`, rank `8 - row`. A black viewer
//! sees the board rotated by 180 degrees; the cell is first mirrored
//! (`row' = 7 - row`, `col' = 7 - col`) and then mapped the same way. With that
//! rule the top-left cell `(0, 0)` is `a8` for white and `h1` for black, and
//! `a1` is `(7, 0)` for white and `(0, 7)` for black. Spectators (unknown
//! color) get the white orientation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::PlayerColor;
use crate::error::DomainError;

pub const BOARD_SIZE: u8 = 8;

const FILES: &[u8; 8] = b"abcdefgh";

/// Absolute square; `file` 0 is `a`, `rank` 0 is rank 1. Serialized as its
/// algebraic name so a decoded square is always on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Result<Self, DomainError> {
        if file >= BOARD_SIZE || rank >= BOARD_SIZE {
            return Err(DomainError::validation(format!(
                "square out of range: file {}, rank {}",
                file, rank
            )));
        }
        Ok(Self { file, rank })
    }

    pub fn file(self) -> u8 {
        self.file
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    /// Screen cell showing this square for `viewer`.
    pub fn to_cell(self, viewer: PlayerColor) -> BoardCell {
        let cell = BoardCell {
            row: BOARD_SIZE - 1 - self.rank,
            col: self.file,
        };
        if viewer.is_flipped() {
            cell.mirrored()
        } else {
            cell
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            FILES[self.file as usize] as char,
            self.rank + 1
        )
    }
}

impl FromStr for Square {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(DomainError::parse(format!("bad square: {}", s)));
        }
        let file = bytes[0].to_ascii_lowercase();
        let rank = bytes[1];
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(DomainError::parse(format!("bad square: {}", s)));
        }
        Ok(Self {
            file: file - b'a',
            rank: rank - b'1',
        })
    }
}

impl TryFrom<String> for Square {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(value: Square) -> Self {
        value.to_string()
    }
}

/// A cell of the board as drawn for a particular viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardCell {
    pub row: u8,
    pub col: u8,
}

impl BoardCell {
    pub fn new(row: u8, col: u8) -> Result<Self, DomainError> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(DomainError::validation(format!(
                "cell out of range: ({}, {})",
                row, col
            )));
        }
        Ok(Self { row, col })
    }

    /// Rotate by 180 degrees.
    pub fn mirrored(self) -> Self {
        Self {
            row: BOARD_SIZE - 1 - self.row,
            col: BOARD_SIZE - 1 - self.col,
        }
    }

    /// Absolute square under this cell for `viewer`.
    ///
    /// Black's mapping is a full 180 degree rotation, so black's top-left
    /// `(0, 0)` is `h1`, not `a1`; `a1` sits at `(0, 7)`.
    pub fn to_square(self, viewer: PlayerColor) -> Square {
        let cell = if viewer.is_flipped() {
            self.mirrored()
        } else {
            self
        };
        Square {
            file: cell.col,
            rank: BOARD_SIZE - 1 - cell.row,
        }
    }
}

/// Encode a screen cell as absolute square notation (`"e4"`).
pub fn to_notation(cell: BoardCell, viewer: PlayerColor) -> String {
    cell.to_square(viewer).to_string()
}

/// Decode absolute square notation into the screen cell showing it for `viewer`.
pub fn from_notation(code: &str, viewer: PlayerColor) -> Result<BoardCell, DomainError> {
    Ok(code.parse::<Square>()?.to_cell(viewer))
}
