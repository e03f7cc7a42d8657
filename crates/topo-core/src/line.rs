//! Connectors between nodes (or free points).
//!
//! A line owns two endpoints and the control points between them. The
//! path length is cached; every mutable accessor to the points clears it,
//! so the cache can never outlive the geometry it was computed from.

use crate::geometry::{Direction, Point, Rect, distance_to_segment};
use kurbo::{BezPath, ParamCurve, ParamCurveArclen, ParamCurveNearest, PathSeg};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Tolerance for arc-length and nearest-point solving, in pixels.
const ACCURACY: f64 = 0.1;
/// Length of the straight stub a polyline leaves a docked anchor with.
const POLYLINE_STUB: f64 = 20.0;
/// Smallest handle length of a default curve leaving an anchor.
const MIN_CURVE_OFFSET: f64 = 20.0;

pub type ControlPoints = SmallVec<[Point; 2]>;

/// Path interpolation through the control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    #[default]
    #[serde(rename = "line")]
    Straight,
    Polyline,
    Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnd {
    From,
    To,
}

/// How a playing line animation travels along the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineAnimateType {
    /// A single dash marches from `from` to `to`.
    #[default]
    Dash,
    /// The visible part of the path grows from `from`.
    Grow,
}

fn default_arrow_size() -> f64 {
    5.0
}

fn default_span() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    #[serde(rename = "name", default)]
    pub kind: LineKind,
    from: Point,
    to: Point,
    #[serde(rename = "controlPoints", default)]
    controls: ControlPoints,
    #[serde(default)]
    pub from_arrow: Option<String>,
    #[serde(default)]
    pub to_arrow: Option<String>,
    #[serde(default = "default_arrow_size")]
    pub from_arrow_size: f64,
    #[serde(default = "default_arrow_size")]
    pub to_arrow_size: f64,
    /// Control points were placed by the user and survive endpoint moves.
    #[serde(default)]
    pub manual_cps: bool,
    #[serde(default)]
    pub animate_type: LineAnimateType,
    /// Travel speed, in path pixels per tick.
    #[serde(default = "default_span")]
    pub animate_span: f64,
    #[serde(default)]
    pub animate_color: Option<String>,

    #[serde(skip)]
    length: Option<f64>,
    /// Distance travelled by the running animation.
    #[serde(skip)]
    pub animate_pos: f64,
}

impl Line {
    pub fn new(kind: LineKind, from: Point, to: Point) -> Self {
        let mut line = Self {
            kind,
            from,
            to,
            controls: ControlPoints::new(),
            from_arrow: None,
            to_arrow: None,
            from_arrow_size: default_arrow_size(),
            to_arrow_size: default_arrow_size(),
            manual_cps: false,
            animate_type: LineAnimateType::Dash,
            animate_span: default_span(),
            animate_color: None,
            length: None,
            animate_pos: 0.0,
        };
        line.calc_control_points();
        line
    }

    pub fn from(&self) -> &Point {
        &self.from
    }

    pub fn to(&self) -> &Point {
        &self.to
    }

    pub fn controls(&self) -> &[Point] {
        &self.controls
    }

    pub fn end(&self, end: LineEnd) -> &Point {
        match end {
            LineEnd::From => &self.from,
            LineEnd::To => &self.to,
        }
    }

    pub fn from_mut(&mut self) -> &mut Point {
        self.length = None;
        &mut self.from
    }

    pub fn to_mut(&mut self) -> &mut Point {
        self.length = None;
        &mut self.to
    }

    pub fn end_mut(&mut self, end: LineEnd) -> &mut Point {
        match end {
            LineEnd::From => self.from_mut(),
            LineEnd::To => self.to_mut(),
        }
    }

    pub fn controls_mut(&mut self) -> &mut ControlPoints {
        self.length = None;
        &mut self.controls
    }

    /// Drop the cached length.
    pub fn invalidate(&mut self) {
        self.length = None;
    }

    /// Endpoints and control points in path order.
    pub fn all_points(&self) -> impl Iterator<Item = Point> + '_ {
        std::iter::once(self.from)
            .chain(self.controls.iter().copied())
            .chain(std::iter::once(self.to))
    }

    pub fn bounds(&self) -> Rect {
        Rect::bounding(self.all_points())
    }

    fn for_each_point(&mut self, mut f: impl FnMut(&mut Point)) {
        self.length = None;
        f(&mut self.from);
        for cp in &mut self.controls {
            f(cp);
        }
        f(&mut self.to);
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.for_each_point(|p| p.translate(dx, dy));
    }

    pub fn scale(&mut self, factor: f64, center: Point) {
        self.for_each_point(|p| {
            p.x = center.x + (p.x - center.x) * factor;
            p.y = center.y + (p.y - center.y) * factor;
        });
    }

    pub fn rotate(&mut self, angle: f64, center: Point) {
        self.for_each_point(|p| p.rotate(angle, center));
    }

    // ─── Routing ─────────────────────────────────────────────────────────

    /// Replace the control points with the default routing for `kind`.
    pub fn calc_control_points(&mut self) {
        self.controls = match self.kind {
            LineKind::Straight => ControlPoints::new(),
            LineKind::Curve => curve_controls(self.from, self.to),
            LineKind::Polyline => polyline_controls(self.from, self.to),
        };
        self.length = None;
    }

    // ─── Path & length ───────────────────────────────────────────────────

    /// The line as a kurbo path. Curves with a malformed control list fall
    /// back to the chord.
    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.from.to_kurbo());
        match (self.kind, self.controls.as_slice()) {
            (LineKind::Curve, [c1, c2]) => {
                path.curve_to(c1.to_kurbo(), c2.to_kurbo(), self.to.to_kurbo());
            }
            (LineKind::Polyline, cps) => {
                for cp in cps {
                    path.line_to(cp.to_kurbo());
                }
                path.line_to(self.to.to_kurbo());
            }
            _ => path.line_to(self.to.to_kurbo()),
        }
        path
    }

    fn compute_length(&self) -> f64 {
        self.to_bez_path()
            .segments()
            .map(|seg| seg.arclen(ACCURACY))
            .sum()
    }

    /// Path length, computed once per geometry change.
    pub fn length(&mut self) -> f64 {
        if let Some(len) = self.length {
            return len;
        }
        let len = self.compute_length();
        log::trace!("line length recomputed: {len:.2}");
        self.length = Some(len);
        len
    }

    pub fn cached_length(&self) -> Option<f64> {
        self.length
    }

    /// The first `travel` pixels of the path.
    pub fn partial_path(&self, travel: f64) -> BezPath {
        let mut remaining = travel.max(0.0);
        let mut segments: Vec<PathSeg> = Vec::new();
        for seg in self.to_bez_path().segments() {
            let len = seg.arclen(ACCURACY);
            if remaining >= len {
                segments.push(seg);
                remaining -= len;
                continue;
            }
            if remaining > 0.0 {
                let t = seg.inv_arclen(remaining, ACCURACY);
                segments.push(seg.subsegment(0.0..t));
            }
            break;
        }
        BezPath::from_path_segments(segments.into_iter())
    }

    /// Where the line's label sits: the chord midpoint, the middle of the
    /// longest horizontal polyline segment, or the curve at t = 0.5.
    pub fn text_center(&self) -> Point {
        match (self.kind, self.controls.as_slice()) {
            (LineKind::Curve, [c1, c2]) => {
                let cubic = kurbo::CubicBez::new(
                    self.from.to_kurbo(),
                    c1.to_kurbo(),
                    c2.to_kurbo(),
                    self.to.to_kurbo(),
                );
                let p = cubic.eval(0.5);
                Point::new(p.x, p.y)
            }
            (LineKind::Polyline, _) => {
                let pts: Vec<Point> = self.all_points().collect();
                let longest = |horizontal_only: bool| {
                    pts.windows(2)
                        .filter(|w| !horizontal_only || (w[0].y - w[1].y).abs() < 0.5)
                        .max_by(|a, b| a[0].distance(a[1]).total_cmp(&b[0].distance(b[1])))
                        .map(|w| Point::new((w[0].x + w[1].x) / 2.0, (w[0].y + w[1].y) / 2.0))
                };
                longest(true)
                    .or_else(|| longest(false))
                    .unwrap_or(self.from)
            }
            _ => Point::new((self.from.x + self.to.x) / 2.0, (self.from.y + self.to.y) / 2.0),
        }
    }

    /// The point an arrowhead at `end` points away from.
    pub fn arrow_tail(&self, end: LineEnd) -> Point {
        match (self.kind, self.controls.as_slice()) {
            (LineKind::Curve, [c1, c2]) => {
                let cubic = kurbo::CubicBez::new(
                    self.from.to_kurbo(),
                    c1.to_kurbo(),
                    c2.to_kurbo(),
                    self.to.to_kurbo(),
                );
                let t = match end {
                    LineEnd::From => 0.1,
                    LineEnd::To => 0.9,
                };
                let p = cubic.eval(t);
                Point::new(p.x, p.y)
            }
            (LineKind::Polyline, cps @ [_, ..]) => match end {
                LineEnd::From => cps[0],
                LineEnd::To => cps[cps.len() - 1],
            },
            _ => match end {
                LineEnd::From => self.to,
                LineEnd::To => self.from,
            },
        }
    }

    // ─── Hit testing ─────────────────────────────────────────────────────

    /// Whether `pt` is within `padding` of the path.
    pub fn hit(&self, pt: Point, padding: f64) -> bool {
        if self.kind != LineKind::Curve {
            let pts: Vec<Point> = self.all_points().collect();
            return pts
                .windows(2)
                .any(|w| distance_to_segment(pt, w[0], w[1]) <= padding);
        }
        let target = pt.to_kurbo();
        self.to_bez_path()
            .segments()
            .any(|seg| seg.nearest(target, ACCURACY).distance_sq <= padding * padding)
    }

    pub fn hit_end(&self, pt: Point, radius: f64) -> Option<LineEnd> {
        if self.to.hit(pt, radius) {
            Some(LineEnd::To)
        } else if self.from.hit(pt, radius) {
            Some(LineEnd::From)
        } else {
            None
        }
    }

    pub fn hit_control(&self, pt: Point, radius: f64) -> Option<usize> {
        self.controls.iter().position(|cp| cp.hit(pt, radius))
    }
}

fn curve_controls(from: Point, to: Point) -> ControlPoints {
    let offset = ((to.x - from.x).abs().max((to.y - from.y).abs()) / 2.0).max(MIN_CURVE_OFFSET);
    let mid_x = (from.x + to.x) / 2.0;
    let handle = |p: Point| {
        if p.direction == Direction::None {
            Point::new(mid_x, p.y)
        } else {
            let (vx, vy) = p.direction.vector();
            Point::new(p.x + vx * offset, p.y + vy * offset)
        }
    };
    let mut cps = ControlPoints::new();
    cps.push(handle(from));
    cps.push(handle(to));
    cps
}

fn polyline_controls(from: Point, to: Point) -> ControlPoints {
    let stub = |p: Point| {
        let (vx, vy) = p.direction.vector();
        Point::new(p.x + vx * POLYLINE_STUB, p.y + vy * POLYLINE_STUB)
    };
    let (start, end) = (stub(from), stub(to));
    let mut pts = ControlPoints::new();
    if from.direction != Direction::None {
        pts.push(start);
    }
    if start.x != end.x && start.y != end.y {
        let vertical_first = matches!(from.direction, Direction::Up | Direction::Bottom);
        if vertical_first {
            let mid_y = (start.y + end.y) / 2.0;
            pts.push(Point::new(start.x, mid_y));
            pts.push(Point::new(end.x, mid_y));
        } else {
            let mid_x = (start.x + end.x) / 2.0;
            pts.push(Point::new(mid_x, start.y));
            pts.push(Point::new(mid_x, end.y));
        }
    }
    if to.direction != Direction::None {
        pts.push(end);
    }
    pts.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn straight_length_and_cache() {
        let mut line = Line::new(LineKind::Straight, Point::new(0.0, 0.0), Point::new(30.0, 40.0));
        assert_eq!(line.cached_length(), None);
        assert!((line.length() - 50.0).abs() < 1e-9);
        assert!(line.cached_length().is_some());
        line.to_mut().x = 0.0;
        assert_eq!(line.cached_length(), None);
        assert!((line.length() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn curve_length_grows_with_endpoint_distance() {
        let mut line = Line::new(LineKind::Curve, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        line.controls_mut().clear();
        line.controls_mut().push(Point::new(30.0, 40.0));
        line.controls_mut().push(Point::new(70.0, 40.0));
        let mut last = line.length();
        for x in [150.0, 200.0, 300.0] {
            line.to_mut().x = x;
            let len = line.length();
            assert!(len > last, "{len} should exceed {last}");
            last = len;
        }
    }

    #[test]
    fn polyline_routes_with_stubs() {
        let from = Point::with_direction(0.0, 0.0, Direction::Right);
        let to = Point::with_direction(100.0, 100.0, Direction::Left);
        let line = Line::new(LineKind::Polyline, from, to);
        let cps: Vec<(f64, f64)> = line.controls().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(
            cps,
            vec![(20.0, 0.0), (50.0, 0.0), (50.0, 100.0), (80.0, 100.0)]
        );
    }

    #[test]
    fn polyline_label_uses_longest_horizontal_segment() {
        let line = Line::new(
            LineKind::Polyline,
            Point::new(0.0, 0.0),
            Point::new(100.0, 300.0),
        );
        // (0,0) → (50,0) → (50,300) → (100,300): both horizontals are 50 wide.
        let c = line.text_center();
        assert!(c.y == 0.0 || c.y == 300.0, "label at {c:?}");
    }

    #[test]
    fn curve_hit_and_miss() {
        let line = Line::new(LineKind::Curve, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!(line.hit(Point::new(50.0, 1.0), 3.0));
        assert!(!line.hit(Point::new(50.0, 30.0), 3.0));
    }

    #[test]
    fn partial_path_is_a_prefix() {
        let line = Line::new(LineKind::Straight, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let half = line.partial_path(25.0);
        let bbox = kurbo::Shape::bounding_box(&half);
        assert!((bbox.x1 - 25.0).abs() < 0.5);
    }

    #[test]
    fn kind_names_round_trip() {
        assert_eq!(serde_json::to_string(&LineKind::Straight).unwrap(), r#""line""#);
        let k: LineKind = serde_json::from_str(r#""curve""#).unwrap();
        assert_eq!(k, LineKind::Curve);
    }
}
