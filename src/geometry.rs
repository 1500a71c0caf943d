//! Integer geometry primitives
//!
//! All coordinates are in board units (nanometres). The y axis points down,
//! so `top <= bottom` for every rectangle.

use serde::{Deserialize, Serialize};

/// One millimetre in board units
pub const MM: i64 = 1_000_000;

/// A 2D point in board units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn translate(&self, dx: i64, dy: i64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Rotate around the origin by `degrees`.
    ///
    /// Quarter turns are computed exactly; other angles are rounded to the
    /// nearest unit.
    pub fn rotate(&self, degrees: f64) -> Point {
        let normalized = degrees.rem_euclid(360.0);
        if normalized == 0.0 {
            return *self;
        }
        if normalized == 90.0 {
            return Point::new(self.y, -self.x);
        }
        if normalized == 180.0 {
            return Point::new(-self.x, -self.y);
        }
        if normalized == 270.0 {
            return Point::new(-self.y, self.x);
        }
        let (sin, cos) = normalized.to_radians().sin_cos();
        let x = self.x as f64;
        let y = self.y as f64;
        Point::new(
            (x * cos + y * sin).round() as i64,
            (-x * sin + y * cos).round() as i64,
        )
    }

    /// Mirror across the horizontal axis through the origin
    pub fn mirror_y(&self) -> Point {
        Point::new(self.x, -self.y)
    }
}

/// An axis-aligned rectangle with non-negative size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    /// Create a rectangle; negative sizes are clamped to zero.
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width: width.max(0),
            height: height.max(0),
        }
    }

    /// Create a rectangle from its edges, in any order
    pub fn from_edges(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        let (l, r) = if left <= right { (left, right) } else { (right, left) };
        let (t, b) = if top <= bottom { (top, bottom) } else { (bottom, top) };
        Self::new(l, t, r - l, b - t)
    }

    /// Smallest rectangle enclosing every point, or `None` for no points
    pub fn enclosing(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut l, mut t, mut r, mut b) = (first.x, first.y, first.x, first.y);
        for p in iter {
            l = l.min(p.x);
            t = t.min(p.y);
            r = r.max(p.x);
            b = b.max(p.y);
        }
        Some(Rect::from_edges(l, t, r, b))
    }

    /// Union of every rectangle, or `None` when empty
    pub fn union_all(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
        rects.into_iter().reduce(|acc, r| acc.union(&r))
    }

    pub fn left(&self) -> i64 {
        self.x
    }

    pub fn top(&self) -> i64 {
        self.y
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> i64 {
        self.x + self.width / 2
    }

    pub fn center_y(&self) -> i64 {
        self.y + self.height / 2
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x(), self.center_y())
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left(), self.top())
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.left(), self.bottom())
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left(),
            Point::new(self.right(), self.top()),
            self.bottom_right(),
            self.bottom_left(),
        ]
    }

    pub fn area(&self) -> i128 {
        self.width as i128 * self.height as i128
    }

    /// Check if a point lies inside or on the edge of this rectangle
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Check if `other` lies entirely within this rectangle
    pub fn contains(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// Check if this rectangle overlaps another.
    ///
    /// Rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() <= other.left()
            || self.left() >= other.right()
            || self.bottom() <= other.top()
            || self.top() >= other.bottom())
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_edges(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Grow by `amount` on every side
    pub fn inflate(&self, amount: i64) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + 2 * amount,
            self.height + 2 * amount,
        )
    }

    pub fn translate(&self, dx: i64, dy: i64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Same size, with the top-left corner at `origin`
    pub fn with_origin(&self, origin: Point) -> Rect {
        Rect::new(origin.x, origin.y, self.width, self.height)
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rect(x={}, y={}, width={}, height={})",
            self.x, self.y, self.width, self.height
        )
    }
}
