use serde::Serialize;

use crate::ir::Position;

/// Axis-aligned rectangle in canvas coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn at(position: Position, width: f32, height: f32) -> Self {
        Self::new(position.x, position.y, width, height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Overlap test with `margin` of required clearance on every side.
    pub fn overlaps_with_margin(&self, other: &Rect, margin: f32) -> bool {
        self.x < other.right() + margin
            && self.right() + margin > other.x
            && self.y < other.bottom() + margin
            && self.bottom() + margin > other.y
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Bounding box of all rects, `None` when empty.
    pub fn enclosing<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc, rect| match acc {
            Some(bounds) => Some(rect.union(&bounds)),
            None => Some(*rect),
        })
    }
}

/// Rounds `value` to the nearest multiple of `grid`.
pub fn snap_to_grid(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    let snapped = (value / grid).round() * grid;
    // avoid -0.0 in serialized output
    if snapped == 0.0 { 0.0 } else { snapped }
}

/// Rounds `value` up to the next multiple of `grid`.
pub fn snap_up_to_grid(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    let snapped = (value / grid).ceil() * grid;
    if snapped == 0.0 { 0.0 } else { snapped }
}

/// Rounds `value` down to the previous multiple of `grid`.
pub fn snap_down_to_grid(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    let snapped = (value / grid).floor() * grid;
    if snapped == 0.0 { 0.0 } else { snapped }
}

pub fn snap_position(position: Position, grid: f32) -> Position {
    Position::new(snap_to_grid(position.x, grid), snap_to_grid(position.y, grid))
}

pub fn is_on_grid(value: f32, grid: f32) -> bool {
    if grid <= 0.0 {
        return true;
    }
    let steps = value / grid;
    (steps - steps.round()).abs() < 1e-3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapping_is_idempotent() {
        for value in [-131.0, -10.0, -9.99, 0.0, 9.99, 10.0, 29.5, 1234.567] {
            let once = snap_to_grid(value, 20.0);
            assert_eq!(snap_to_grid(once, 20.0), once, "value {value}");
            assert!(is_on_grid(once, 20.0));
        }
    }

    #[test]
    fn snapping_rounds_each_axis_independently() {
        let snapped = snap_position(Position::new(29.0, 31.0), 20.0);
        assert_eq!(snapped, Position::new(20.0, 40.0));
    }

    #[test]
    fn snap_up_never_moves_backwards() {
        assert_eq!(snap_up_to_grid(21.0, 20.0), 40.0);
        assert_eq!(snap_up_to_grid(40.0, 20.0), 40.0);
        assert_eq!(snap_up_to_grid(-5.0, 20.0), 0.0);
        assert_eq!(snap_down_to_grid(-5.0, 20.0), -20.0);
        assert_eq!(snap_down_to_grid(39.0, 20.0), 20.0);
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(100.0, 0.0, 100.0, 50.0);
        assert!(!a.intersects(&b));
        assert!(a.overlaps_with_margin(&b, 10.0));
        assert!(a.intersects(&b.translate(-1.0, 0.0)));
    }

    #[test]
    fn enclosing_covers_all_rects() {
        let rects = [
            Rect::new(10.0, 10.0, 20.0, 20.0),
            Rect::new(-5.0, 40.0, 10.0, 10.0),
        ];
        let bounds = Rect::enclosing(rects.iter()).unwrap();
        assert_eq!(bounds, Rect::new(-5.0, 10.0, 35.0, 40.0));
        assert!(Rect::enclosing(std::iter::empty()).is_none());
    }
}
