//! Geometry primitives: points, directions and axis-aligned rectangles.
//!
//! Angles are in degrees everywhere in the public API, matching the
//! document format; conversion to radians happens at the trig call sites.

use crate::id::PenId;
use serde::{Deserialize, Serialize};

/// The side of a shape an anchor faces. Lines leave and enter anchors
/// along this direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    None,
    Up,
    Right,
    Bottom,
    Left,
}

impl Direction {
    /// Unit vector pointing away from the shape.
    pub fn vector(self) -> (f64, f64) {
        match self {
            Direction::None => (0.0, 0.0),
            Direction::Up => (0.0, -1.0),
            Direction::Right => (1.0, 0.0),
            Direction::Bottom => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
        }
    }

    /// Direction after rotating clockwise by `angle` degrees, snapped to
    /// the nearest quarter turn.
    pub fn rotated(self, angle: f64) -> Self {
        let order = [Direction::Up, Direction::Right, Direction::Bottom, Direction::Left];
        let Some(pos) = order.iter().position(|d| *d == self) else {
            return Direction::None;
        };
        let quarters = (angle / 90.0).round().rem_euclid(4.0) as usize;
        order[(pos + quarters) % 4]
    }
}

/// A point on the canvas.
///
/// Besides coordinates, a point may describe an anchor (`direction`,
/// `hidden`) or a line endpoint docked to a node (`owner` + `anchor_index`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "is_none_direction")]
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_index: Option<usize>,
    /// Node this endpoint is docked to.
    #[serde(rename = "ownerId", skip_serializing_if = "Option::is_none")]
    pub owner: Option<PenId>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

fn is_none_direction(d: &Direction) -> bool {
    *d == Direction::None
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            direction: Direction::None,
            anchor_index: None,
            owner: None,
            hidden: false,
        }
    }

    pub const fn with_direction(x: f64, y: f64, direction: Direction) -> Self {
        Self {
            x,
            y,
            direction,
            anchor_index: None,
            owner: None,
            hidden: false,
        }
    }

    /// Rotate in place by `angle` degrees (clockwise in screen space)
    /// around `center`.
    ///
    /// Whole turns return early so unrotated shapes keep their exact
    /// coordinates.
    pub fn rotate(&mut self, angle: f64, center: Point) {
        if angle % 360.0 == 0.0 {
            return;
        }
        let (sin, cos) = angle.to_radians().sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        self.x = center.x + dx * cos - dy * sin;
        self.y = center.y + dx * sin + dy * cos;
    }

    /// Rotated copy; the anchor direction turns along with the point.
    #[must_use]
    pub fn rotated(mut self, angle: f64, center: Point) -> Self {
        self.rotate(angle, center);
        if angle % 360.0 != 0.0 {
            self.direction = self.direction.rotated(angle);
        }
        self
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// True when `other` lies within `radius` on both axes.
    pub fn hit(&self, other: Point, radius: f64) -> bool {
        (self.x - other.x).abs() <= radius && (self.y - other.y).abs() <= radius
    }

    /// Whether this endpoint is docked to a node anchor.
    pub fn is_docked(&self) -> bool {
        self.owner.is_some() && self.anchor_index.is_some()
    }

    /// Drop the docking reference, keeping the coordinates.
    pub fn undock(&mut self) {
        self.owner = None;
        self.anchor_index = None;
        self.direction = Direction::None;
    }

    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x, self.y)
    }
}

/// Angle in degrees of the vector `from → to`, measured clockwise from
/// the positive x axis in screen space.
pub fn angle_between(from: Point, to: Point) -> f64 {
    (to.y - from.y).atan2(to.x - from.x).to_degrees()
}

/// Ray-casting point-in-polygon test.
pub fn point_in_polygon(pt: Point, polygon: &[Point]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > pt.y) != (b.y > pt.y) && pt.x < (b.x - a.x) * (pt.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from `pt` to the segment `a → b`.
pub fn distance_to_segment(pt: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return pt.distance(a);
    }
    let t = (((pt.x - a.x) * dx + (pt.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    pt.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// An axis-aligned rectangle.
///
/// The right/bottom edges and the center are computed on demand, so a
/// rect never carries stale derived values after its fields are edited.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect spanning two opposite corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (b.x - a.x).abs(),
            (b.y - a.y).abs(),
        )
    }

    /// Axis-aligned bounding box of a point set. Empty input yields a zero rect.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.x, first.y);
        for p in iter {
            x1 = x1.min(p.x);
            y1 = y1.min(p.y);
            x2 = x2.max(p.x);
            y2 = y2.max(p.y);
        }
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn ex(&self) -> f64 {
        self.x + self.width
    }

    pub fn ey(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Re-position so the center lands on `c`, keeping the size.
    pub fn set_center(&mut self, c: Point) {
        self.x = c.x - self.width / 2.0;
        self.y = c.y - self.height / 2.0;
    }

    /// The four corners: top-left, top-right, bottom-right, bottom-left.
    pub fn to_points(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.ex(), self.y),
            Point::new(self.ex(), self.ey()),
            Point::new(self.x, self.ey()),
        ]
    }

    /// Corners after rotating the rect `angle` degrees about its center.
    pub fn rotated_points(&self, angle: f64) -> [Point; 4] {
        let center = self.center();
        let mut pts = self.to_points();
        for p in &mut pts {
            p.rotate(angle, center);
        }
        pts
    }

    /// Axis-aligned containment with an optional padding tolerance.
    pub fn hit(&self, pt: Point, padding: f64) -> bool {
        pt.x >= self.x - padding
            && pt.x <= self.ex() + padding
            && pt.y >= self.y - padding
            && pt.y <= self.ey() + padding
    }

    /// Containment for the rect rotated `angle` degrees about its center.
    pub fn hit_rotate(&self, pt: Point, angle: f64, padding: f64) -> bool {
        if angle % 360.0 == 0.0 {
            return self.hit(pt, padding);
        }
        let expanded = Rect::new(
            self.x - padding,
            self.y - padding,
            self.width + padding * 2.0,
            self.height + padding * 2.0,
        );
        point_in_polygon(pt, &expanded.rotated_points(angle))
    }

    /// Whether `other` lies fully inside this rect.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x && other.ex() <= self.ex() && other.y >= self.y && other.ey() <= self.ey()
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Scale position and size about `center`.
    pub fn scale(&mut self, factor: f64, center: Point) {
        self.x = center.x - (center.x - self.x) * factor;
        self.y = center.y - (center.y - self.y) * factor;
        self.width *= factor;
        self.height *= factor;
    }

    pub fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(self.x, self.y, self.ex(), self.ey())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn rotate_whole_turns_is_bit_identical() {
        let original = Point::new(0.1 + 0.2, 1.0 / 3.0);
        for angle in [0.0, 360.0, -360.0, 720.0] {
            let mut p = original;
            p.rotate(angle, Point::new(17.3, -4.1));
            assert_eq!(p.x.to_bits(), original.x.to_bits());
            assert_eq!(p.y.to_bits(), original.y.to_bits());
        }
    }

    #[test]
    fn rotate_quarter_turn_about_origin() {
        let mut p = Point::new(10.0, 0.0);
        p.rotate(90.0, Point::new(0.0, 0.0));
        assert!(p.x.abs() < EPS, "x = {}", p.x);
        assert!((p.y - 10.0).abs() < EPS, "y = {}", p.y);
    }

    #[test]
    fn rotated_point_turns_direction() {
        let p = Point::with_direction(10.0, 0.0, Direction::Right);
        let r = p.rotated(90.0, Point::new(0.0, 0.0));
        assert_eq!(r.direction, Direction::Bottom);
    }

    #[test]
    fn corners_in_winding_order() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        let [tl, tr, br, bl] = r.to_points();
        assert_eq!((tl.x, tl.y), (10.0, 20.0));
        assert_eq!((tr.x, tr.y), (40.0, 20.0));
        assert_eq!((br.x, br.y), (40.0, 60.0));
        assert_eq!((bl.x, bl.y), (10.0, 60.0));
    }

    #[test]
    fn hit_padding_boundary() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);
        let p = 5.0;
        assert!(r.hit(Point::new(100.0 + p, 25.0), p));
        assert!(!r.hit(Point::new(100.0 + p + 1e-6, 25.0), p));
        assert!(r.hit(Point::new(50.0, -p), p));
        assert!(!r.hit(Point::new(50.0, -p - 1e-6), p));
    }

    #[test]
    fn hit_rotate_uses_rotated_outline() {
        let r = Rect::new(0.0, 40.0, 100.0, 20.0);
        // A point above the unrotated bar but inside it once turned upright.
        let pt = Point::new(50.0, 5.0);
        assert!(!r.hit(pt, 0.0));
        assert!(r.hit_rotate(pt, 90.0, 0.0));
        // The original right end is no longer covered.
        assert!(!r.hit_rotate(Point::new(95.0, 50.0), 90.0, 0.0));
    }

    #[test]
    fn bounding_of_points() {
        let r = Rect::bounding([Point::new(3.0, 9.0), Point::new(-1.0, 4.0), Point::new(7.0, 5.0)]);
        assert_eq!(r, Rect::new(-1.0, 4.0, 8.0, 5.0));
        assert_eq!(Rect::bounding(std::iter::empty()), Rect::default());
    }

    #[test]
    fn segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((distance_to_segment(Point::new(5.0, 3.0), a, b) - 3.0).abs() < EPS);
        assert!((distance_to_segment(Point::new(14.0, 3.0), a, b) - 5.0).abs() < EPS);
    }

    #[test]
    fn scale_about_center() {
        let mut r = Rect::new(10.0, 10.0, 20.0, 20.0);
        r.scale(2.0, Point::new(0.0, 0.0));
        assert_eq!(r, Rect::new(20.0, 20.0, 40.0, 40.0));
    }
}
