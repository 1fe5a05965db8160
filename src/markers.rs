//! Marker geometry and labeling for the floor-plan view.
//!
//! Markers live at percentage coordinates in [0, 100] on both axes so their
//! positions are independent of how large the floor plan is rendered. The
//! mapping between terminal cells and percentages lives here so the editor,
//! the renderer, and the persistence layer all agree on it.

use ratatui::layout::Rect;

/// Clamp a percentage coordinate to [0, 100].
pub fn clamp_percent(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Map a terminal cell to percentage coordinates over the rendered area.
///
/// The offset into the area is divided by the area size and scaled to 100,
/// then each axis is clamped. Events outside the area land on the boundary.
pub fn position_from_cell(column: u16, row: u16, area: Rect) -> (f64, f64) {
    if area.width == 0 || area.height == 0 {
        return (0.0, 0.0);
    }
    let x = (column as f64 - area.x as f64) / area.width as f64 * 100.0;
    let y = (row as f64 - area.y as f64) / area.height as f64 * 100.0;
    (clamp_percent(x), clamp_percent(y))
}

/// Map percentage coordinates to the cell they occupy within the area.
pub fn cell_from_position(x: f64, y: f64, area: Rect) -> (u16, u16) {
    let max_col = area.width.saturating_sub(1) as f64;
    let max_row = area.height.saturating_sub(1) as f64;
    let col = area.x as f64 + clamp_percent(x) / 100.0 * max_col;
    let row = area.y as f64 + clamp_percent(y) / 100.0 * max_row;
    (col.round() as u16, row.round() as u16)
}

/// Short label for a marker.
///
/// Multi-word names abbreviate to the first letter of up to the first three
/// words; single words keep their first three characters. Uppercased.
pub fn abbreviate(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let abbr: String = if words.len() > 1 {
        words
            .iter()
            .take(3)
            .filter_map(|w| w.chars().next())
            .collect()
    } else {
        name.trim().chars().take(3).collect()
    };
    abbr.to_uppercase()
}

/// Find the marker whose rendered label covers the given cell.
///
/// A label occupies one row starting at the marker's cell and extending the
/// width of its abbreviation. The last match wins so the marker drawn on top
/// is the one picked up.
pub fn marker_at_cell<'a>(
    locations: &'a [crate::db::Location],
    column: u16,
    row: u16,
    area: Rect,
) -> Option<&'a crate::db::Location> {
    locations.iter().rev().find(|location| {
        let (col, marker_row) = cell_from_position(location.x, location.y, area);
        let width = abbreviate(&location.name).chars().count().max(1) as u16;
        row == marker_row && column >= col && column < col.saturating_add(width)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Location;

    fn area() -> Rect {
        Rect::new(10, 5, 80, 40)
    }

    #[test]
    fn test_clamp_is_idempotent() {
        for v in [-10.0, 0.0, 37.5, 100.0, 250.0] {
            let once = clamp_percent(v);
            assert_eq!(once, clamp_percent(once));
        }
    }

    #[test]
    fn test_position_inside_area_stays_in_range() {
        let a = area();
        for col in a.x..a.x + a.width {
            for row in a.y..a.y + a.height {
                let (x, y) = position_from_cell(col, row, a);
                assert!((0.0..=100.0).contains(&x), "x={} out of range", x);
                assert!((0.0..=100.0).contains(&y), "y={} out of range", y);
            }
        }
    }

    #[test]
    fn test_position_outside_area_clamps_to_boundary() {
        let a = area();
        let (x, y) = position_from_cell(0, 0, a);
        assert_eq!((x, y), (0.0, 0.0));
        let (x, y) = position_from_cell(200, 200, a);
        assert_eq!((x, y), (100.0, 100.0));
    }

    #[test]
    fn test_position_origin_and_center() {
        let a = area();
        assert_eq!(position_from_cell(a.x, a.y, a), (0.0, 0.0));
        let (x, y) = position_from_cell(a.x + a.width / 2, a.y + a.height / 2, a);
        assert_eq!((x, y), (50.0, 50.0));
    }

    #[test]
    fn test_empty_area_maps_to_origin() {
        assert_eq!(position_from_cell(3, 3, Rect::new(0, 0, 0, 0)), (0.0, 0.0));
    }

    #[test]
    fn test_cell_from_position_round_trips_corners() {
        let a = area();
        assert_eq!(cell_from_position(0.0, 0.0, a), (a.x, a.y));
        assert_eq!(
            cell_from_position(100.0, 100.0, a),
            (a.x + a.width - 1, a.y + a.height - 1)
        );
    }

    #[test]
    fn test_abbreviate_multi_word() {
        assert_eq!(abbreviate("Back Left Column"), "BLC");
        assert_eq!(abbreviate("Mirror Door"), "MD");
        assert_eq!(abbreviate("north east wall corner"), "NEW");
    }

    #[test]
    fn test_abbreviate_single_word() {
        assert_eq!(abbreviate("Wall"), "WAL");
        assert_eq!(abbreviate("ab"), "AB");
        assert_eq!(abbreviate(""), "");
    }

    fn location(name: &str, x: f64, y: f64) -> Location {
        Location {
            id: name.to_lowercase(),
            store_id: "s".to_string(),
            name: name.to_string(),
            x,
            y,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_marker_at_cell_hits_label_span() {
        let a = area();
        let locations = vec![location("Back Left Column", 50.0, 50.0)];
        let (col, row) = cell_from_position(50.0, 50.0, a);

        // "BLC" spans three cells on the marker's row
        for offset in 0..3 {
            let hit = marker_at_cell(&locations, col + offset, row, a);
            assert_eq!(hit.map(|l| l.id.as_str()), Some("back left column"));
        }
        assert!(marker_at_cell(&locations, col + 3, row, a).is_none());
        assert!(marker_at_cell(&locations, col, row + 1, a).is_none());
    }

    #[test]
    fn test_marker_at_cell_prefers_topmost() {
        let a = area();
        let locations = vec![location("First", 50.0, 50.0), location("Second", 50.0, 50.0)];
        let (col, row) = cell_from_position(50.0, 50.0, a);
        let hit = marker_at_cell(&locations, col, row, a).unwrap();
        assert_eq!(hit.id, "second");
    }
}
