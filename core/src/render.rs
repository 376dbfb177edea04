//! Per-player text projection of the board.

use crate::spot::Spot;

/// Render the grid as seen by `viewer`, in the wire format consumed by the
/// transport: a `<rows>x<columns>` header followed by one line per cell in
/// row-major order, every line newline-terminated.
///
/// Cell lines are `none` (removed), `down` (face down), `my <card>` (face
/// up and held by the viewer) or `up <card>` (face up, not held by the
/// viewer, whether unheld or held by someone else).
pub(crate) fn render(rows: usize, columns: usize, spots: &[Spot], viewer: &str) -> String {
    let mut out = String::with_capacity(8 + spots.len() * 8);
    out.push_str(&format!("{rows}x{columns}\n"));
    for spot in spots {
        match (&spot.card, spot.face_up, &spot.holder) {
            (None, _, _) => out.push_str("none\n"),
            (Some(_), false, _) => out.push_str("down\n"),
            (Some(card), true, Some(holder)) if holder == viewer => {
                out.push_str("my ");
                out.push_str(card);
                out.push('\n');
            }
            (Some(card), true, _) => {
                out.push_str("up ");
                out.push_str(card);
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(card: Option<&str>, face_up: bool, holder: Option<&str>) -> Spot {
        Spot {
            card: card.map(str::to_string),
            face_up,
            holder: holder.map(str::to_string),
        }
    }

    #[test]
    fn test_render_all_cell_forms() {
        let spots = vec![
            spot(None, false, None),
            spot(Some("A"), false, None),
            spot(Some("A"), true, Some("alice")),
            spot(Some("B"), true, Some("bob")),
            spot(Some("B"), true, None),
            spot(Some("C"), false, None),
        ];
        let view = render(2, 3, &spots, "alice");
        assert_eq!(view, "2x3\nnone\ndown\nmy A\nup B\nup B\ndown\n");
    }

    #[test]
    fn test_render_other_viewer_sees_up_not_my() {
        let spots = vec![spot(Some("A"), true, Some("alice"))];
        assert_eq!(render(1, 1, &spots, "bob"), "1x1\nup A\n");
    }

    #[test]
    fn test_render_line_count() {
        let spots = vec![spot(Some("A"), false, None); 12];
        let view = render(3, 4, &spots, "p");
        assert_eq!(view.lines().count(), 13);
        assert!(view.ends_with('\n'));
    }
}
