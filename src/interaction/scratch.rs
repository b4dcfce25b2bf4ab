//! Scratch card over the personal note
//!
//! The foil is tracked as a grid of cells. A brush stroke clears every cell
//! whose center lies inside the brush; the note counts as revealed once the
//! cleared share passes the reveal coverage.

use glam::Vec2;

use crate::consts::*;

/// Axis-aligned rectangle in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Position within the rect as 0..1 on both axes; None outside
    pub fn to_uv(&self, pointer: Vec2) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let uv = Vec2::new(
            (pointer.x - self.left) / self.width,
            (pointer.y - self.top) / self.height,
        );
        let inside = (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y);
        inside.then_some(uv)
    }
}

/// Foil coverage of the card
#[derive(Debug, Clone)]
pub struct ScratchCard {
    size: Vec2,
    cell: f32,
    brush_radius: f32,
    cols: usize,
    rows: usize,
    cleared: Vec<bool>,
    cleared_count: usize,
    revealed: bool,
}

impl ScratchCard {
    /// Card of `width` x `height` card pixels with the default brush
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_geometry(width, height, SCRATCH_CELL_PX, SCRATCH_BRUSH_RADIUS)
    }

    pub fn with_geometry(width: f32, height: f32, cell: f32, brush_radius: f32) -> Self {
        let cell = cell.max(0.5);
        let cols = ((width / cell).ceil() as usize).max(1);
        let rows = ((height / cell).ceil() as usize).max(1);
        Self {
            size: Vec2::new(width, height),
            cell,
            brush_radius,
            cols,
            rows,
            cleared: vec![false; cols * rows],
            cleared_count: 0,
            revealed: false,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Cleared share of the foil (0.0 - 1.0)
    pub fn coverage(&self) -> f32 {
        self.cleared_count as f32 / self.cleared.len() as f32
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Erase around `point` (card pixels).
    ///
    /// Returns true only for the stroke that reveals the note.
    pub fn scratch(&mut self, point: Vec2) -> bool {
        if self.revealed {
            return false;
        }

        let (Some((c0, c1)), Some((r0, r1))) = (
            self.span(point.x, self.cols),
            self.span(point.y, self.rows),
        ) else {
            return false;
        };

        for row in r0..=r1 {
            for col in c0..=c1 {
                let center = Vec2::new(
                    (col as f32 + 0.5) * self.cell,
                    (row as f32 + 0.5) * self.cell,
                );
                let idx = row * self.cols + col;
                if !self.cleared[idx] && center.distance(point) <= self.brush_radius {
                    self.cleared[idx] = true;
                    self.cleared_count += 1;
                }
            }
        }

        if self.coverage() > SCRATCH_REVEAL_COVERAGE {
            self.revealed = true;
            log::info!("Scratch card revealed at {:.0}%", self.coverage() * 100.0);
            return true;
        }
        false
    }

    /// Cell indices the brush can touch along one axis
    fn span(&self, center: f32, cells: usize) -> Option<(usize, usize)> {
        let first = ((center - self.brush_radius) / self.cell).floor().max(0.0);
        let last = ((center + self.brush_radius) / self.cell)
            .floor()
            .min(cells as f32 - 1.0);
        (first <= last).then(|| (first as usize, last as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ten one-pixel cells; a half-pixel brush clears exactly one
    fn strip() -> ScratchCard {
        ScratchCard::with_geometry(10.0, 1.0, 1.0, 0.5)
    }

    #[test]
    fn test_reveal_needs_more_than_forty_percent() {
        let mut card = strip();
        for i in 0..4 {
            assert!(!card.scratch(Vec2::new(i as f32 + 0.5, 0.5)));
        }
        assert_eq!(card.coverage(), 0.4);
        assert!(!card.is_revealed());

        // Same cell again changes nothing
        assert!(!card.scratch(Vec2::new(3.5, 0.5)));
        assert!(!card.is_revealed());

        assert!(card.scratch(Vec2::new(4.5, 0.5)));
        assert!(card.is_revealed());
    }

    #[test]
    fn test_reveal_fires_once() {
        let mut card = strip();
        let fired = (0..10)
            .filter(|i| card.scratch(Vec2::new(*i as f32 + 0.5, 0.5)))
            .count();
        assert_eq!(fired, 1);
        // Strokes after the reveal are ignored
        assert_eq!(card.coverage(), 0.5);
    }

    #[test]
    fn test_strokes_outside_the_card_clear_nothing() {
        let mut card = ScratchCard::new(SCRATCH_CARD_WIDTH, SCRATCH_CARD_HEIGHT);
        card.scratch(Vec2::new(-100.0, 50.0));
        card.scratch(Vec2::new(50.0, 500.0));
        card.scratch(Vec2::new(f32::NAN, 10.0));
        assert_eq!(card.coverage(), 0.0);
    }

    #[test]
    fn test_single_dab_is_a_brush_disc() {
        let mut card = ScratchCard::new(SCRATCH_CARD_WIDTH, SCRATCH_CARD_HEIGHT);
        assert!(!card.scratch(Vec2::new(150.0, 90.0)));
        let disc = std::f32::consts::PI * SCRATCH_BRUSH_RADIUS * SCRATCH_BRUSH_RADIUS;
        let expected = disc / (SCRATCH_CARD_WIDTH * SCRATCH_CARD_HEIGHT);
        assert!((card.coverage() - expected).abs() < 0.01);
    }

    #[test]
    fn test_sweeping_rows_reveals() {
        let mut card = ScratchCard::new(SCRATCH_CARD_WIDTH, SCRATCH_CARD_HEIGHT);
        let mut revealed_at = None;
        'sweep: for row in 0..9 {
            for step in 0..31 {
                let p = Vec2::new(step as f32 * 10.0, 10.0 + row as f32 * 20.0);
                if card.scratch(p) {
                    revealed_at = Some(row);
                    break 'sweep;
                }
            }
        }
        // Rows 0 and 1 clear the top 55 px (about 31%)
        assert_eq!(revealed_at, Some(2));
        assert!(card.coverage() > SCRATCH_REVEAL_COVERAGE);
        assert!(card.coverage() < 0.45);
    }

    #[test]
    fn test_rect_uv() {
        let rect = ScreenRect::new(100.0, 50.0, 300.0, 180.0);
        assert_eq!(rect.to_uv(Vec2::new(250.0, 140.0)), Some(Vec2::new(0.5, 0.5)));
        assert_eq!(rect.to_uv(Vec2::new(99.0, 140.0)), None);
        assert_eq!(ScreenRect::new(0.0, 0.0, 0.0, 10.0).to_uv(Vec2::ZERO), None);
    }
}
