//! Screen-space rectangles and points

use std::fmt;

/// A point in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle in screen pixels. `left`/`top` may be negative on
/// multi-monitor layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// Matched template location, in screen coordinates.
pub type BoundingBox = Rect;

impl Rect {
    pub const fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Center point, rounded down.
    pub fn center(&self) -> Point {
        Point {
            x: self.left + (self.width / 2) as i32,
            y: self.top + (self.height / 2) as i32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Same size, moved by `(dx, dy)`.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..*self
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.left, self.top
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center() {
        let bbox = Rect::new(140, 160, 40, 40);
        assert_eq!(bbox.center(), Point::new(160, 180));
    }

    #[test]
    fn test_offset_and_display() {
        let rect = Rect::new(10, 20, 30, 40).offset(100, 100);
        assert_eq!(rect, Rect::new(110, 120, 30, 40));
        assert_eq!(rect.to_string(), "30x40+110+120");
        assert!(Rect::new(0, 0, 0, 5).is_empty());
    }
}
