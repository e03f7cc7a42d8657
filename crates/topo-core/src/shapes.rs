//! Anchor and text layouts of the builtin shapes.
//!
//! Drawing lives in `topo-render`; these are the pure layout halves so the
//! model can be initialised without a renderer.

use crate::geometry::{Direction, Point, Rect};
use crate::node::{Anchors, Node};

/// Triangle with its apex at the top-middle: apex, the midpoints of the
/// two slanted sides and the bottom middle.
pub fn triangle_anchors(node: &Node) -> Anchors {
    let r = node.rect;
    let c = r.center();
    let mut anchors = Anchors::new();
    anchors.push(Point::with_direction(r.x + r.width / 4.0, c.y, Direction::Left));
    anchors.push(Point::with_direction(c.x, r.y, Direction::Up));
    anchors.push(Point::with_direction(r.x + r.width * 3.0 / 4.0, c.y, Direction::Right));
    anchors.push(Point::with_direction(c.x, r.ey(), Direction::Bottom));
    anchors
}

/// Horizontal fork bar: both ends, plus a top and bottom anchor at the
/// center of each quarter of the width (ten in total).
pub fn fork_h_anchors(node: &Node) -> Anchors {
    let r = node.rect;
    let cy = r.center().y;
    let mut anchors = Anchors::new();
    anchors.push(Point::with_direction(r.x, cy, Direction::Left));
    anchors.push(Point::with_direction(r.ex(), cy, Direction::Right));
    for i in 0..4 {
        let x = r.x + r.width * f64::from(2 * i + 1) / 8.0;
        anchors.push(Point::with_direction(x, r.y, Direction::Up));
        anchors.push(Point::with_direction(x, r.ey(), Direction::Bottom));
    }
    anchors
}

/// Vertical counterpart of [`fork_h_anchors`].
pub fn fork_v_anchors(node: &Node) -> Anchors {
    let r = node.rect;
    let cx = r.center().x;
    let mut anchors = Anchors::new();
    anchors.push(Point::with_direction(cx, r.y, Direction::Up));
    anchors.push(Point::with_direction(cx, r.ey(), Direction::Bottom));
    for i in 0..4 {
        let y = r.y + r.height * f64::from(2 * i + 1) / 8.0;
        anchors.push(Point::with_direction(r.x, y, Direction::Left));
        anchors.push(Point::with_direction(r.ex(), y, Direction::Right));
    }
    anchors
}

/// Square inscribed in the ellipse.
pub fn circle_text_rect(node: &Node) -> Rect {
    let b = crate::node::default_text_rect(node);
    let inset = (1.0 - std::f64::consts::FRAC_1_SQRT_2) / 2.0;
    Rect::new(
        b.x + b.width * inset,
        b.y + b.height * inset,
        b.width * (1.0 - 2.0 * inset),
        b.height * (1.0 - 2.0 * inset),
    )
}

/// The middle half of the box, which a diamond fully covers.
pub fn diamond_text_rect(node: &Node) -> Rect {
    let b = crate::node::default_text_rect(node);
    Rect::new(b.x + b.width / 4.0, b.y + b.height / 4.0, b.width / 2.0, b.height / 2.0)
}

/// Lower-middle band of the triangle.
pub fn triangle_text_rect(node: &Node) -> Rect {
    let b = crate::node::default_text_rect(node);
    Rect::new(b.x + b.width / 4.0, b.y + b.height / 2.0, b.width / 2.0, b.height / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pen::Pen;
    use crate::registry::ShapeRegistry;
    use crate::surface::Surface;
    use pretty_assertions::assert_eq;

    fn noop(_: &mut dyn Surface, _: &Pen) {}

    #[test]
    fn fork_shapes_have_ten_anchors() {
        let mut registry = ShapeRegistry::new();
        registry.register_shape("forkH", noop, Some(fork_h_anchors), None, None);
        registry.register_shape("forkV", noop, Some(fork_v_anchors), None, None);

        let mut h = Node::new("forkH", Rect::new(0.0, 0.0, 80.0, 10.0));
        h.init(0.0, &registry);
        assert_eq!(h.anchors.len(), 10);
        assert_eq!((h.anchors[2].x, h.anchors[2].y), (10.0, 0.0));
        assert_eq!((h.anchors[9].x, h.anchors[9].y), (70.0, 10.0));

        let mut v = Node::new("forkV", Rect::new(0.0, 0.0, 10.0, 80.0));
        v.init(0.0, &registry);
        assert_eq!(v.anchors.len(), 10);
        assert_eq!(v.anchors[3].direction, Direction::Right);
    }

    #[test]
    fn circle_text_fits_inside() {
        let node = Node::new("circle", Rect::new(0.0, 0.0, 100.0, 100.0));
        let r = circle_text_rect(&node);
        let corner = Point::new(r.x, r.y);
        assert!(corner.distance(Point::new(50.0, 50.0)) <= 50.0 + 1e-9);
    }
}
