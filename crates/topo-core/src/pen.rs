//! The pen model: every drawable entity in a document.
//!
//! A [`Pen`] is either a [`Node`] (a rect-bounded shape) or a [`Line`]
//! (a connector). The state both variants share (style, text, rotation,
//! animation timing, event bindings) lives in [`PenBase`]; the
//! shape-specific state lives in the [`PenKind`] payload.

use crate::geometry::{Point, Rect};
use crate::id::PenId;
use crate::line::{Line, LineKind};
use crate::node::Node;
use crate::registry::ShapeRegistry;
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Stable key of a pen in the document arena.
pub type PenIndex = NodeIndex;

// ─── Style ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBaseline {
    Top,
    #[default]
    Middle,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Shadow {
    pub color: String,
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            color: "rgba(0,0,0,0.3)".into(),
            blur: 4.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub weight: String,
    pub style: String,
    pub color: String,
    /// Multiple of `size`.
    pub line_height: f64,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub background: Option<String>,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Arial".into(),
            size: 12.0,
            weight: "normal".into(),
            style: "normal".into(),
            color: "#222222".into(),
            line_height: 1.5,
            text_align: TextAlign::Center,
            text_baseline: TextBaseline::Middle,
            background: None,
        }
    }
}

impl Font {
    /// CSS shorthand understood by canvas-like surfaces.
    pub fn css(&self) -> String {
        format!("{} {} {}px {}", self.style, self.weight, self.size, self.family)
    }
}

/// Stroke/fill state applied before a pen's shape function runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Style {
    pub stroke_style: String,
    pub fill_style: Option<String>,
    pub line_width: f64,
    pub line_dash: SmallVec<[f64; 4]>,
    pub line_dash_offset: f64,
    pub line_cap: LineCap,
    pub global_alpha: f64,
    pub shadow: Option<Shadow>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_style: "#222222".into(),
            fill_style: None,
            line_width: 1.0,
            line_dash: SmallVec::new(),
            line_dash_offset: 0.0,
            line_cap: LineCap::Butt,
            global_alpha: 1.0,
            shadow: None,
        }
    }
}

// ─── Animation timing ────────────────────────────────────────────────────

/// Per-pen animation bookkeeping shared by nodes and lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimateTiming {
    /// Timeline origin in host milliseconds. `0` means not playing.
    pub animate_start: f64,
    /// Number of cycles to play; `<= 0` loops forever.
    pub animate_cycle: i32,
    #[serde(skip)]
    pub animate_cycle_index: u32,
    /// Tag of the pens to start when this animation completes.
    pub next_animate: Option<String>,
    /// Start automatically when the document opens.
    pub animate_play: bool,
}

// ─── Event bindings ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTrigger {
    Click,
    #[serde(alias = "dblClick")]
    DblClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// Navigate the host to `value`.
    Link,
    /// Start the animation of every pen tagged `value`.
    Animate,
    /// Ask the host to run the script/function named by `value`.
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenEvent {
    #[serde(rename = "type")]
    pub trigger: EventTrigger,
    pub action: EventAction,
    #[serde(default)]
    pub value: String,
}

// ─── Pen ─────────────────────────────────────────────────────────────────

/// State shared by nodes and lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PenBase {
    pub tags: SmallVec<[String; 2]>,
    pub text: String,
    pub font: Font,
    pub text_max_line: u32,
    pub text_offset_x: f64,
    pub text_offset_y: f64,
    /// Clockwise rotation in degrees about the pen's own center.
    pub rotate: f64,
    pub locked: bool,
    pub visible: bool,
    #[serde(flatten)]
    pub style: Style,
    #[serde(flatten)]
    pub timing: AnimateTiming,
    pub events: SmallVec<[PenEvent; 1]>,
    /// Opaque host data carried through save/load.
    pub data: Option<serde_json::Value>,
}

impl Default for PenBase {
    fn default() -> Self {
        Self {
            tags: SmallVec::new(),
            text: String::new(),
            font: Font::default(),
            text_max_line: 0,
            text_offset_x: 0.0,
            text_offset_y: 0.0,
            rotate: 0.0,
            locked: false,
            visible: true,
            style: Style::default(),
            timing: AnimateTiming::default(),
            events: SmallVec::new(),
            data: None,
        }
    }
}

/// Shape-specific payload of a pen.
#[derive(Debug, Clone, PartialEq)]
pub enum PenKind {
    Node(Node),
    Line(Line),
}

/// A drawable document entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Pen {
    pub id: PenId,
    pub base: PenBase,
    pub kind: PenKind,
}

impl Pen {
    pub fn node(id: PenId, node: Node) -> Self {
        Self {
            id,
            base: PenBase::default(),
            kind: PenKind::Node(node),
        }
    }

    pub fn line(id: PenId, line: Line) -> Self {
        Self {
            id,
            base: PenBase::default(),
            kind: PenKind::Line(line),
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self.kind, PenKind::Node(_))
    }

    pub fn is_line(&self) -> bool {
        matches!(self.kind, PenKind::Line(_))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match &self.kind {
            PenKind::Node(n) => Some(n),
            PenKind::Line(_) => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match &mut self.kind {
            PenKind::Node(n) => Some(n),
            PenKind::Line(_) => None,
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        match &self.kind {
            PenKind::Line(l) => Some(l),
            PenKind::Node(_) => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut Line> {
        match &mut self.kind {
            PenKind::Line(l) => Some(l),
            PenKind::Node(_) => None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.base.tags.iter().any(|t| t == tag)
    }

    /// Whether a timeline currently owns this pen.
    pub fn is_animating(&self) -> bool {
        self.base.timing.animate_start > 0.0
    }

    /// Recompute every cached geometric field.
    ///
    /// Must run after any change to a node's rect, rotation, padding or
    /// shape name; hit-testing and connector updates read the cache.
    pub fn init(&mut self, registry: &ShapeRegistry) {
        let rotate = self.base.rotate;
        match &mut self.kind {
            PenKind::Node(node) => node.init(rotate, registry),
            PenKind::Line(line) => {
                line.invalidate();
                if line.kind == LineKind::Curve && line.controls().len() != 2 {
                    line.calc_control_points();
                }
            }
        }
    }

    /// Unrotated bounds: the node rect, or the box around every line point.
    pub fn rect(&self) -> Rect {
        match &self.kind {
            PenKind::Node(n) => n.rect,
            PenKind::Line(l) => l.bounds(),
        }
    }

    /// World-space corners (or line points) used for bounding-box math.
    pub fn world_points(&self) -> SmallVec<[Point; 4]> {
        match &self.kind {
            PenKind::Node(n) => n.rect.rotated_points(self.base.rotate).into_iter().collect(),
            PenKind::Line(l) => l.all_points().collect(),
        }
    }

    /// Axis-aligned box around the pen as drawn.
    pub fn world_bounds(&self) -> Rect {
        Rect::bounding(self.world_points())
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Move by a delta. Lines moved as a whole lose their docking.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match &mut self.kind {
            PenKind::Node(n) => n.rect.translate(dx, dy),
            PenKind::Line(l) => {
                l.translate(dx, dy);
                l.from_mut().undock();
                l.to_mut().undock();
            }
        }
    }

    /// Scale geometry and font about `center`.
    pub fn scale(&mut self, factor: f64, center: Point) {
        self.base.font.size *= factor;
        match &mut self.kind {
            PenKind::Node(n) => {
                n.rect.scale(factor, center);
                n.icon_size *= factor;
            }
            PenKind::Line(l) => l.scale(factor, center),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_bounds_of_rotated_node() {
        let mut pen = Pen::node(PenId::intern("bar"), Node::new("rectangle", Rect::new(0.0, 40.0, 100.0, 20.0)));
        pen.base.rotate = 90.0;
        let b = pen.world_bounds();
        assert!((b.x - 40.0).abs() < 1e-9);
        assert!((b.width - 20.0).abs() < 1e-9);
        assert!((b.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn translating_a_line_undocks_it() {
        let mut from = Point::new(0.0, 0.0);
        from.owner = Some(PenId::intern("n1"));
        from.anchor_index = Some(2);
        let line = Line::new(LineKind::Straight, from, Point::new(50.0, 0.0));
        let mut pen = Pen::line(PenId::intern("l1"), line);
        pen.translate(5.0, 5.0);
        let l = pen.as_line().unwrap();
        assert!(!l.from().is_docked());
        assert_eq!((l.from().x, l.from().y), (5.0, 5.0));
    }
}
