//! Line-oriented console front end for the binary.

use std::str::FromStr;

use gambit_domain::{BoardCell, MoveNotation, Promotion};
use gambit_player::SessionView;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Absolute notation, e.g. `e2e4` or `e7e8q`.
    Move(MoveNotation),
    /// Board cells in the player's orientation: `cell 6 4 4 4`.
    Cells {
        from: BoardCell,
        to: BoardCell,
        promotion: Option<Promotion>,
    },
    Back,
    Forward,
    Live,
    Jump(isize),
    Show,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

const CELL_USAGE: &str = "cell <row> <col> <row> <col> [q|r|b|n]";
const JUMP_USAGE: &str = "jump <index>";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let head = words.next().ok_or(CommandError::Empty)?;
        let rest: Vec<&str> = words.collect();

        match head.to_ascii_lowercase().as_str() {
            "back" | "b" => Ok(Command::Back),
            "fwd" | "forward" | "f" => Ok(Command::Forward),
            "live" | "l" => Ok(Command::Live),
            "show" | "s" => Ok(Command::Show),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            "jump" | "j" => match rest.as_slice() {
                [index] => index
                    .parse()
                    .map(Command::Jump)
                    .map_err(|_| CommandError::Usage(JUMP_USAGE)),
                _ => Err(CommandError::Usage(JUMP_USAGE)),
            },
            "cell" => parse_cells(&rest),
            _ => head
                .parse::<MoveNotation>()
                .map(Command::Move)
                .map_err(|_| CommandError::Unknown(head.to_string())),
        }
    }
}

fn parse_cells(args: &[&str]) -> Result<Command, CommandError> {
    let usage = || CommandError::Usage(CELL_USAGE);
    let (coords, promotion) = match args {
        [r1, c1, r2, c2] => ([*r1, *c1, *r2, *c2], None),
        [r1, c1, r2, c2, promo] => {
            let promo = promo
                .chars()
                .next()
                .and_then(Promotion::from_char)
                .ok_or_else(usage)?;
            ([*r1, *c1, *r2, *c2], Some(promo))
        }
        _ => return Err(usage()),
    };

    let mut values = [0u8; 4];
    for (slot, raw) in values.iter_mut().zip(coords) {
        *slot = raw.parse().map_err(|_| usage())?;
    }
    let from = BoardCell::new(values[0], values[1]).map_err(|_| usage())?;
    let to = BoardCell::new(values[2], values[3]).map_err(|_| usage())?;
    Ok(Command::Cells {
        from,
        to,
        promotion,
    })
}

/// One-line summary of a view for the text output mode.
pub fn describe(view: &SessionView) -> String {
    let mut line = format!(
        "[{}] {} | you: {} | {} to move",
        view.connection, view.status, view.self_color, view.current_turn
    );

    if !view.moves.is_empty() {
        let moves: Vec<String> = view.moves.iter().map(|m| m.to_string()).collect();
        line.push_str(&format!(" | moves: {}", moves.join(" ")));
    }
    if let Some(pending) = view.pending_move {
        line.push_str(&format!(" (pending {})", pending));
    }
    if !view.viewing_live {
        line.push_str(&format!(" | viewing {}", view.viewed_index + 1));
    }
    if view.in_check {
        line.push_str(" | check");
    }
    if view.mated {
        line.push_str(" | mate");
    }
    if let Some(result) = &view.result {
        line.push_str(&format!(" | result {}", result));
    }
    if let Some(notice) = &view.notice {
        line.push_str(&format!(" | {}", notice));
    }
    if let Some(error) = &view.fatal_error {
        line.push_str(&format!(" | error: {}", error));
    }
    line
}
