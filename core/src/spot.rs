//! Grid cells and per-player turn state.

use std::fmt;

/// A grid position: row then column, both zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub row: usize,
    pub column: usize,
}

impl Coord {
    /// Create a new coordinate
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.column)
    }
}

/// A cell in the grid.
///
/// `card` is `None` once the cell has been removed; removal is terminal.
/// A held spot is always face up with a card present, and a removed spot
/// is never face up or held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spot {
    pub(crate) card: Option<String>,
    pub(crate) face_up: bool,
    pub(crate) holder: Option<String>,
}

impl Spot {
    /// Build a spot from a board label. An empty label means the cell
    /// starts out with no card.
    pub(crate) fn from_label(label: String) -> Self {
        Self {
            card: if label.is_empty() { None } else { Some(label) },
            face_up: false,
            holder: None,
        }
    }

    /// The card label, if the cell has not been removed.
    pub fn card(&self) -> Option<&str> {
        self.card.as_deref()
    }

    /// Whether the card is currently face up.
    pub fn is_face_up(&self) -> bool {
        self.face_up
    }

    /// The player currently controlling this spot, if any.
    pub fn holder(&self) -> Option<&str> {
        self.holder.as_deref()
    }
}

/// Per-player turn state.
///
/// A turn moves through three phases: flip a first card, flip a second
/// card, then on the player's next flip the pair is settled (removed if it
/// matched, turned face down if not).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// No card flipped yet this turn.
    Idle,
    /// First card flipped and still held by the player.
    FirstHeld(Coord),
    /// First card flipped but its hold was dropped by a failed second
    /// flip. The card stays face up until the player's next turn begins.
    FirstReleased(Coord),
    /// Both cards of the turn are flipped; `matched` records whether their
    /// labels were equal. On a match both spots stay held; on a miss both
    /// stay face up but unheld.
    Pair {
        first: Coord,
        second: Coord,
        matched: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_display() {
        assert_eq!(Coord::new(2, 7).to_string(), "(2,7)");
    }

    #[test]
    fn test_spot_from_label() {
        let spot = Spot::from_label("A".to_string());
        assert_eq!(spot.card(), Some("A"));
        assert!(!spot.is_face_up());
        assert!(spot.holder().is_none());
    }

    #[test]
    fn test_spot_from_empty_label_has_no_card() {
        let spot = Spot::from_label(String::new());
        assert_eq!(spot.card(), None);
        assert!(!spot.is_face_up());
        assert!(spot.holder().is_none());
    }
}
