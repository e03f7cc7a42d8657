//! Name-keyed table of shape and arrowhead functions.
//!
//! Nodes name their shape (`"rectangle"`, `"forkH"`, …) and look up the
//! functions here for drawing and for anchor/text/icon layout. Shape
//! libraries populate the table at startup; the editor refuses to add a
//! node whose shape is not registered.

use crate::geometry::{Point, Rect};
use crate::node::{Anchors, Node};
use crate::pen::Pen;
use crate::surface::Surface;
use std::collections::HashMap;

/// Builds the shape's outline as the current path. The caller fills and
/// strokes it with the pen's style.
pub type DrawFn = fn(&mut dyn Surface, &Pen);
pub type AnchorFn = fn(&Node) -> Anchors;
pub type RectFn = fn(&Node) -> Rect;
/// Draws an arrowhead at `tip`, pointing away from `tail`, in `color`.
pub type ArrowFn = fn(&mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str);

#[derive(Debug, Clone, Copy)]
pub struct ShapeFns {
    pub draw: DrawFn,
    pub anchors: Option<AnchorFn>,
    pub icon_rect: Option<RectFn>,
    pub text_rect: Option<RectFn>,
}

#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    shapes: HashMap<String, ShapeFns>,
    arrows: HashMap<String, ArrowFn>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a shape.
    pub fn register_shape(
        &mut self,
        name: impl Into<String>,
        draw: DrawFn,
        anchors: Option<AnchorFn>,
        icon_rect: Option<RectFn>,
        text_rect: Option<RectFn>,
    ) {
        let name = name.into();
        log::debug!("register shape {name}");
        self.shapes.insert(
            name,
            ShapeFns {
                draw,
                anchors,
                icon_rect,
                text_rect,
            },
        );
    }

    pub fn register_arrow(&mut self, name: impl Into<String>, draw: ArrowFn) {
        self.arrows.insert(name.into(), draw);
    }

    pub fn shape(&self, name: &str) -> Option<&ShapeFns> {
        self.shapes.get(name)
    }

    pub fn arrow(&self, name: &str) -> Option<ArrowFn> {
        self.arrows.get(name).copied()
    }

    pub fn has_shape(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Direction;

    fn noop(_: &mut dyn Surface, _: &Pen) {}

    fn single_anchor(node: &Node) -> Anchors {
        let c = node.rect.center();
        let mut a = Anchors::new();
        a.push(Point::with_direction(c.x, c.y, Direction::None));
        a
    }

    #[test]
    fn registered_anchor_fn_overrides_default() {
        let mut registry = ShapeRegistry::new();
        registry.register_shape("dot", noop, Some(single_anchor), None, None);
        assert!(registry.has_shape("dot"));
        assert!(!registry.has_shape("rectangle"));

        let mut node = Node::new("dot", Rect::new(0.0, 0.0, 10.0, 10.0));
        node.init(0.0, &registry);
        assert_eq!(node.anchors.len(), 1);
    }
}
