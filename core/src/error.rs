//! Error types surfaced by the board.

use crate::spot::Coord;

/// Failures raised by [`Board::flip`](crate::Board::flip).
///
/// After any failure the board is back in a consistent state: a first card
/// held by the caller has been released and the next waiter on its cell
/// has been woken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlipError {
    /// The target cell has no card, discovered either on entry or after
    /// waking from a wait.
    #[error("no card at {coord}")]
    NoCard { coord: Coord },
    /// After a wait, the cell had been taken by another player before this
    /// caller could claim it.
    #[error("card at {coord} is still held by another player")]
    StillHeld { coord: Coord },
    /// A second flip targeted a held cell (possibly the caller's own
    /// first card).
    #[error("card at {coord} is held")]
    Held { coord: Coord },
    /// The coordinates fall outside the grid.
    #[error("{coord} is outside the {rows}x{columns} board")]
    OutOfRange {
        coord: Coord,
        rows: usize,
        columns: usize,
    },
}

/// Failures raised while constructing a board or parsing a board file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The board file contained no non-blank lines.
    #[error("board file is empty")]
    Empty,
    /// The first line was not `<rows>x<columns>` in ASCII digits.
    #[error("malformed dimension line {line:?}")]
    BadDimensions { line: String },
    /// A dimension was zero, or the cell count overflows.
    #[error("unusable grid dimensions {rows}x{columns}")]
    Dimensions { rows: usize, columns: usize },
    /// The number of labels did not match `rows * columns`.
    #[error("expected {expected} labels, found {actual}")]
    LabelCount { expected: usize, actual: usize },
    #[error("failed to read board file: {0}")]
    Io(#[from] std::io::Error),
}
