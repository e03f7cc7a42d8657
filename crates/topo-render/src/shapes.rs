//! Builtin shape and arrowhead painters.
//!
//! A shape painter only builds the outline as the current path; the render
//! pipeline fills and strokes it with the pen's style. Arrowheads paint
//! themselves because solid and hollow heads differ in fill.

use std::f64::consts::TAU;
use topo_core::geometry::angle_between;
use topo_core::shapes::{
    circle_text_rect, diamond_text_rect, fork_h_anchors, fork_v_anchors, triangle_anchors,
    triangle_text_rect,
};
use topo_core::{Pen, Point, ShapeRegistry, Surface};

/// Populate `registry` with every builtin shape and arrowhead.
pub fn register_builtin_shapes(registry: &mut ShapeRegistry) {
    registry.register_shape("rectangle", rectangle, None, None, None);
    registry.register_shape("circle", circle, None, None, Some(circle_text_rect));
    registry.register_shape("diamond", diamond, None, None, Some(diamond_text_rect));
    registry.register_shape(
        "triangle",
        triangle,
        Some(triangle_anchors),
        None,
        Some(triangle_text_rect),
    );
    registry.register_shape("text", text_box, None, None, None);
    registry.register_shape("image", image, None, None, None);
    registry.register_shape("forkH", fork, Some(fork_h_anchors), None, None);
    registry.register_shape("forkV", fork, Some(fork_v_anchors), None, None);
    registry.register_shape("combine", combine, None, None, None);

    registry.register_arrow("triangleSolid", triangle_solid);
    registry.register_arrow("triangle", triangle_hollow);
    registry.register_arrow("circleSolid", circle_solid);
    registry.register_arrow("circle", circle_hollow);
    registry.register_arrow("diamondSolid", diamond_solid);
    registry.register_arrow("diamond", diamond_hollow);
    registry.register_arrow("line", arrow_line);
    registry.register_arrow("lineUp", arrow_line_up);
    registry.register_arrow("lineDown", arrow_line_down);
}

// ─── Shapes ──────────────────────────────────────────────────────────────

fn rectangle(s: &mut dyn Surface, pen: &Pen) {
    let r = pen.rect();
    s.rect(r.x, r.y, r.width, r.height);
}

fn circle(s: &mut dyn Surface, pen: &Pen) {
    let r = pen.rect();
    let c = r.center();
    s.ellipse(c.x, c.y, r.width / 2.0, r.height / 2.0);
}

fn diamond(s: &mut dyn Surface, pen: &Pen) {
    let r = pen.rect();
    let c = r.center();
    s.move_to(c.x, r.y);
    s.line_to(r.ex(), c.y);
    s.line_to(c.x, r.ey());
    s.line_to(r.x, c.y);
    s.close_path();
}

fn triangle(s: &mut dyn Surface, pen: &Pen) {
    let r = pen.rect();
    s.move_to(r.center().x, r.y);
    s.line_to(r.ex(), r.ey());
    s.line_to(r.x, r.ey());
    s.close_path();
}

/// Text boxes have no outline; the pipeline draws only their text.
fn text_box(_: &mut dyn Surface, _: &Pen) {}

/// The bitmap itself is a host concern; the frame marks where it goes.
fn image(s: &mut dyn Surface, pen: &Pen) {
    let r = pen.rect();
    if pen.as_node().is_some_and(|n| n.image.is_none()) {
        log::trace!("image node #{} has no source", pen.id);
    }
    s.rect(r.x, r.y, r.width, r.height);
}

fn fork(s: &mut dyn Surface, pen: &Pen) {
    let r = pen.rect();
    s.rect(r.x, r.y, r.width, r.height);
}

/// Group container: its children draw themselves, the group draws nothing
/// unless styled with a fill.
fn combine(s: &mut dyn Surface, pen: &Pen) {
    if pen.base.style.fill_style.is_some() {
        let r = pen.rect();
        s.rect(r.x, r.y, r.width, r.height);
    }
}

// ─── Arrowheads ──────────────────────────────────────────────────────────

/// A point `back` px behind `tip` along `angle` (degrees), pushed
/// `side` px perpendicular to it.
fn offset(tip: Point, angle: f64, back: f64, side: f64) -> (f64, f64) {
    let (sin, cos) = angle.to_radians().sin_cos();
    (
        tip.x - back * cos - side * sin,
        tip.y - back * sin + side * cos,
    )
}

fn finish(s: &mut dyn Surface, color: &str, solid: bool) {
    if solid {
        s.set_fill_style(color);
    } else {
        s.set_fill_style("#ffffff");
    }
    s.fill();
    s.set_stroke_style(color);
    s.stroke();
}

fn triangle_path(s: &mut dyn Surface, tail: Point, tip: Point, size: f64) {
    let a = angle_between(tail, tip);
    let (lx, ly) = offset(tip, a, size * 2.0, -size);
    let (rx, ry) = offset(tip, a, size * 2.0, size);
    s.begin_path();
    s.move_to(tip.x, tip.y);
    s.line_to(lx, ly);
    s.line_to(rx, ry);
    s.close_path();
}

fn triangle_solid(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    triangle_path(s, tail, tip, size);
    finish(s, color, true);
}

fn triangle_hollow(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    triangle_path(s, tail, tip, size);
    finish(s, color, false);
}

fn circle_path(s: &mut dyn Surface, tail: Point, tip: Point, size: f64) {
    let a = angle_between(tail, tip);
    let (cx, cy) = offset(tip, a, size, 0.0);
    s.begin_path();
    s.arc(cx, cy, size, 0.0, TAU);
}

fn circle_solid(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    circle_path(s, tail, tip, size);
    finish(s, color, true);
}

fn circle_hollow(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    circle_path(s, tail, tip, size);
    finish(s, color, false);
}

fn diamond_path(s: &mut dyn Surface, tail: Point, tip: Point, size: f64) {
    let a = angle_between(tail, tip);
    let (lx, ly) = offset(tip, a, size * 1.5, -size * 0.75);
    let (bx, by) = offset(tip, a, size * 3.0, 0.0);
    let (rx, ry) = offset(tip, a, size * 1.5, size * 0.75);
    s.begin_path();
    s.move_to(tip.x, tip.y);
    s.line_to(lx, ly);
    s.line_to(bx, by);
    s.line_to(rx, ry);
    s.close_path();
}

fn diamond_solid(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    diamond_path(s, tail, tip, size);
    finish(s, color, true);
}

fn diamond_hollow(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    diamond_path(s, tail, tip, size);
    finish(s, color, false);
}

/// Open chevron; `sides` picks which barbs to draw (-1 left, 1 right).
fn barbs(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str, sides: &[f64]) {
    let a = angle_between(tail, tip);
    s.begin_path();
    for &side in sides {
        let (x, y) = offset(tip, a, size * 2.0, side * size);
        s.move_to(x, y);
        s.line_to(tip.x, tip.y);
    }
    s.set_stroke_style(color);
    s.stroke();
}

fn arrow_line(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    barbs(s, tail, tip, size, color, &[-1.0, 1.0]);
}

fn arrow_line_up(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    barbs(s, tail, tip, size, color, &[-1.0]);
}

fn arrow_line_down(s: &mut dyn Surface, tail: Point, tip: Point, size: f64, color: &str) {
    barbs(s, tail, tip, size, color, &[1.0]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Op, RecordingSurface};
    use pretty_assertions::assert_eq;

    #[test]
    fn builtins_are_registered() {
        let mut registry = ShapeRegistry::new();
        register_builtin_shapes(&mut registry);
        for name in [
            "rectangle", "circle", "diamond", "triangle", "text", "image", "forkH", "forkV",
            "combine",
        ] {
            assert!(registry.has_shape(name), "{name}");
        }
        for name in [
            "triangleSolid", "triangle", "circleSolid", "circle", "diamondSolid", "diamond",
            "line", "lineUp", "lineDown",
        ] {
            assert!(registry.arrow(name).is_some(), "{name}");
        }
    }

    #[test]
    fn triangle_head_points_along_the_line() {
        let mut s = RecordingSurface::new();
        triangle_solid(&mut s, Point::new(0.0, 0.0), Point::new(100.0, 0.0), 5.0, "#000");
        let moves: Vec<_> = s
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::MoveTo(x, y) | Op::LineTo(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(moves.len(), 3);
        assert_eq!(moves[0], (100.0, 0.0));
        // Barbs sit 10px behind the tip, 5px either side.
        assert!((moves[1].0 - 90.0).abs() < 1e-9 && (moves[1].1 + 5.0).abs() < 1e-9);
        assert!((moves[2].0 - 90.0).abs() < 1e-9 && (moves[2].1 - 5.0).abs() < 1e-9);
        assert_eq!(s.count(|op| *op == Op::Fill), 1);
    }
}
