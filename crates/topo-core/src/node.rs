//! Rect-bounded shapes and their cached geometry.

use crate::animation::Keyframe;
use crate::geometry::{Direction, Point, Rect};
use crate::registry::ShapeRegistry;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

/// Connection points of a node. Most shapes have exactly four.
pub type Anchors = SmallVec<[Point; 4]>;

// ─── Lengths ─────────────────────────────────────────────────────────────

/// A length that is either absolute pixels or a percentage of a base.
///
/// Serialized as a number for pixels and as `"N%"` for percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    Percent(f64),
}

impl Default for Length {
    fn default() -> Self {
        Length::Px(0.0)
    }
}

impl Length {
    /// Absolute pixels against `base`.
    pub fn resolve(self, base: f64) -> f64 {
        match self {
            Length::Px(v) => v,
            Length::Percent(p) => base * p / 100.0,
        }
    }

    /// Express `px` as a percentage of `base`. A zero base contributes
    /// nothing rather than dividing by zero.
    pub fn percent_of(px: f64, base: f64) -> Self {
        if base == 0.0 {
            Length::Percent(0.0)
        } else {
            Length::Percent(px / base * 100.0)
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(v) => write!(f, "{v}"),
            Length::Percent(p) => write!(f, "{p}%"),
        }
    }
}

impl Serialize for Length {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Length::Px(v) => serializer.serialize_f64(*v),
            Length::Percent(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Length {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f64),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(v) => Ok(Length::Px(v)),
            Raw::Str(s) => {
                let s = s.trim();
                let (num, percent) = match s.strip_suffix('%') {
                    Some(n) => (n.trim(), true),
                    None => (s.strip_suffix("px").unwrap_or(s).trim(), false),
                };
                let v: f64 = num.parse().map_err(serde::de::Error::custom)?;
                Ok(if percent { Length::Percent(v) } else { Length::Px(v) })
            }
        }
    }
}

/// Layout of a child node relative to its parent's padded content box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RectInParent {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    /// Rotation added on top of the parent's.
    pub rotate: f64,
}

/// Resolved paddings in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

// ─── Node ────────────────────────────────────────────────────────────────

/// A shape bounded by a rect.
///
/// Fields marked `serde(skip)` are derived by [`Node::init`] and must be
/// refreshed after any geometric change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Node {
    /// Shape name, resolved against the [`ShapeRegistry`].
    pub name: String,
    pub rect: Rect,
    pub padding_top: Length,
    pub padding_right: Length,
    pub padding_bottom: Length,
    pub padding_left: Length,
    pub icon: Option<String>,
    pub icon_size: f64,
    pub image: Option<String>,
    /// Host overlay element (DOM id) to remove along with the node.
    pub element_id: Option<String>,
    pub hide_anchor: bool,
    pub rect_in_parent: Option<RectInParent>,
    pub animate_frames: Vec<Keyframe>,

    #[serde(skip)]
    pub padding: Padding,
    #[serde(skip)]
    pub text_rect: Rect,
    #[serde(skip)]
    pub full_text_rect: Rect,
    #[serde(skip)]
    pub icon_rect: Rect,
    #[serde(skip)]
    pub anchors: Anchors,
    #[serde(skip)]
    pub rotated_anchors: Anchors,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: "rectangle".into(),
            rect: Rect::default(),
            padding_top: Length::default(),
            padding_right: Length::default(),
            padding_bottom: Length::default(),
            padding_left: Length::default(),
            icon: None,
            icon_size: 0.0,
            image: None,
            element_id: None,
            hide_anchor: false,
            rect_in_parent: None,
            animate_frames: Vec::new(),
            padding: Padding::default(),
            text_rect: Rect::default(),
            full_text_rect: Rect::default(),
            icon_rect: Rect::default(),
            anchors: Anchors::new(),
            rotated_anchors: Anchors::new(),
        }
    }
}

impl Node {
    pub fn new(name: impl Into<String>, rect: Rect) -> Self {
        Self {
            name: name.into(),
            rect,
            ..Self::default()
        }
    }

    /// Rebuild derived geometry in order: paddings, text rect, icon rect,
    /// anchors, rotated anchors.
    pub fn init(&mut self, rotate: f64, registry: &ShapeRegistry) {
        self.padding = Padding {
            top: self.padding_top.resolve(self.rect.height),
            right: self.padding_right.resolve(self.rect.width),
            bottom: self.padding_bottom.resolve(self.rect.height),
            left: self.padding_left.resolve(self.rect.width),
        };
        self.full_text_rect = self.content_box();

        let fns = registry.shape(&self.name);
        self.text_rect = match fns.and_then(|f| f.text_rect) {
            Some(text_rect) => text_rect(self),
            None => default_text_rect(self),
        };
        self.icon_rect = match fns.and_then(|f| f.icon_rect) {
            Some(icon_rect) => icon_rect(self),
            None => default_icon_rect(self),
        };

        let mut anchors = match fns.and_then(|f| f.anchors) {
            Some(anchors) => anchors(self),
            None => default_anchors(self),
        };
        for (i, a) in anchors.iter_mut().enumerate() {
            a.anchor_index = Some(i);
        }
        self.anchors = anchors;

        let center = self.rect.center();
        self.rotated_anchors = self
            .anchors
            .iter()
            .map(|a| a.rotated(rotate, center))
            .collect();
    }

    /// The rect shrunk by the resolved paddings.
    pub fn content_box(&self) -> Rect {
        let p = self.padding;
        Rect::new(
            self.rect.x + p.left,
            self.rect.y + p.top,
            (self.rect.width - p.left - p.right).max(0.0),
            (self.rect.height - p.top - p.bottom).max(0.0),
        )
    }

    pub fn has_icon(&self) -> bool {
        self.icon.is_some() || self.image.is_some()
    }
}

/// Bottom quarter of the content box when an icon or image is present,
/// otherwise the whole content box.
pub fn default_text_rect(node: &Node) -> Rect {
    let b = node.content_box();
    if node.has_icon() {
        let icon_h = b.height * 3.0 / 4.0;
        Rect::new(b.x, b.y + icon_h, b.width, b.height - icon_h)
    } else {
        b
    }
}

/// Top three quarters of the content box when an icon or image is present.
pub fn default_icon_rect(node: &Node) -> Rect {
    let b = node.content_box();
    if node.has_icon() {
        Rect::new(b.x, b.y, b.width, b.height * 3.0 / 4.0)
    } else {
        b
    }
}

/// Midpoints of the four sides: left, up, right, bottom.
pub fn default_anchors(node: &Node) -> Anchors {
    let r = node.rect;
    let c = r.center();
    let mut anchors = Anchors::new();
    anchors.push(Point::with_direction(r.x, c.y, Direction::Left));
    anchors.push(Point::with_direction(c.x, r.y, Direction::Up));
    anchors.push(Point::with_direction(r.ex(), c.y, Direction::Right));
    anchors.push(Point::with_direction(c.x, r.ey(), Direction::Bottom));
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn init_computes_paddings_and_anchors() {
        let registry = ShapeRegistry::new();
        let mut node = Node::new("rectangle", Rect::new(0.0, 0.0, 200.0, 100.0));
        node.padding_left = Length::Px(10.0);
        node.padding_top = Length::Percent(10.0);
        node.init(0.0, &registry);

        assert_eq!(node.padding.left, 10.0);
        assert_eq!(node.padding.top, 10.0);
        assert_eq!(node.text_rect, Rect::new(10.0, 10.0, 190.0, 90.0));
        assert_eq!(node.anchors.len(), 4);
        assert_eq!(node.anchors[2].direction, Direction::Right);
        assert_eq!(node.anchors[2].anchor_index, Some(2));
        assert_eq!(node.rotated_anchors, node.anchors);
    }

    #[test]
    fn icon_splits_content_box() {
        let registry = ShapeRegistry::new();
        let mut node = Node::new("rectangle", Rect::new(0.0, 0.0, 100.0, 100.0));
        node.icon = Some("\u{e6a1}".into());
        node.init(0.0, &registry);
        assert_eq!(node.icon_rect, Rect::new(0.0, 0.0, 100.0, 75.0));
        assert_eq!(node.text_rect, Rect::new(0.0, 75.0, 100.0, 25.0));
        assert_eq!(node.full_text_rect, Rect::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn rotated_anchors_follow_rotation() {
        let registry = ShapeRegistry::new();
        let mut node = Node::new("rectangle", Rect::new(0.0, 0.0, 100.0, 100.0));
        node.init(90.0, &registry);
        // The right-side anchor swings to the bottom.
        let right = node.rotated_anchors[2];
        assert!((right.x - 50.0).abs() < 1e-9);
        assert!((right.y - 100.0).abs() < 1e-9);
        assert_eq!(right.direction, Direction::Bottom);
    }

    #[test]
    fn lengths_parse_from_numbers_and_strings() {
        let v: Vec<Length> = serde_json::from_str(r#"[12, "25%", "8px"]"#).unwrap();
        assert_eq!(v, vec![Length::Px(12.0), Length::Percent(25.0), Length::Px(8.0)]);
        assert_eq!(serde_json::to_string(&Length::Percent(50.0)).unwrap(), r#""50%""#);
        assert_eq!(Length::percent_of(10.0, 0.0), Length::Percent(0.0));
    }
}
