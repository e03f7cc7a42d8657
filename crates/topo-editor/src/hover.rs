//! Feedback layer: anchor dots, control-point highlight, docking guides,
//! the line being drawn and the rubber-band rectangle.
//!
//! Everything here is computed by the controller; this layer only holds
//! and draws it.

use std::f64::consts::TAU;
use topo_core::{Pen, PenIndex, Point, Rect, ShapeRegistry, Surface, TopologyData};
use topo_render::{StateGuard, draw_pen};

use crate::docking::DockGuides;
use crate::options::Options;

#[derive(Debug, Clone, Default)]
pub struct HoverLayer {
    /// Node under the pointer; its anchors are shown.
    pub node: Option<PenIndex>,
    /// Anchor the pointer is over (or a line end is docking to).
    pub anchor: Option<(PenIndex, usize)>,
    pub line_control: Option<(PenIndex, usize)>,
    pub guides: DockGuides,
    /// Line being drawn; not yet part of the document.
    pub drawing: Option<Pen>,
    pub marquee: Option<Rect>,
}

impl HoverLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drop gesture feedback but keep the plain hover state.
    pub fn clear_transient(&mut self) {
        self.guides = DockGuides::default();
        self.drawing = None;
        self.marquee = None;
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_none()
            && self.anchor.is_none()
            && self.line_control.is_none()
            && self.guides.is_empty()
            && self.drawing.is_none()
            && self.marquee.is_none()
    }

    pub fn render(&self, surface: &mut dyn Surface, doc: &TopologyData, registry: &ShapeRegistry, opts: &Options) {
        let mut s = StateGuard::new(surface);
        s.set_line_width(1.0);
        s.set_stroke_style(&opts.hover_color);

        if !opts.hide_anchors
            && let Some(idx) = self.node.or(self.anchor.map(|a| a.0))
            && let Some(node) = doc.get(idx).and_then(Pen::as_node)
            && !node.hide_anchor
        {
            for (i, a) in node.rotated_anchors.iter().enumerate() {
                let targeted = self.anchor == Some((idx, i));
                if a.hidden && !targeted {
                    continue;
                }
                dot(&mut *s, *a, opts.anchor_radius, if targeted { &opts.hover_color } else { "#ffffff" });
            }
        }

        if let Some((idx, i)) = self.line_control
            && let Some(cp) = doc.get(idx).and_then(Pen::as_line).and_then(|l| l.controls().get(i))
        {
            dot(&mut *s, *cp, opts.anchor_radius, &opts.hover_color);
        }

        if let Some(pen) = &self.drawing {
            draw_pen(&mut *s, pen, registry);
        }

        if !self.guides.is_empty() {
            let b = doc.bounds();
            let (x0, x1) = (b.x.min(0.0) - 1000.0, b.ex() + 1000.0);
            let (y0, y1) = (b.y.min(0.0) - 1000.0, b.ey() + 1000.0);
            s.set_line_dash(&[4.0, 4.0]);
            s.begin_path();
            if let Some(x) = self.guides.x {
                s.move_to(x, y0);
                s.line_to(x, y1);
            }
            if let Some(y) = self.guides.y {
                s.move_to(x0, y);
                s.line_to(x1, y);
            }
            s.stroke();
            s.set_line_dash(&[]);
        }

        if let Some(r) = self.marquee {
            s.begin_path();
            s.rect(r.x, r.y, r.width, r.height);
            s.set_global_alpha(0.1);
            s.set_fill_style(&opts.active_color);
            s.fill();
            s.set_global_alpha(1.0);
            s.set_stroke_style(&opts.active_color);
            s.stroke();
        }
    }
}

fn dot(s: &mut dyn Surface, p: Point, radius: f64, fill: &str) {
    s.begin_path();
    s.arc(p.x, p.y, radius, 0.0, TAU);
    s.set_fill_style(fill);
    s.fill();
    s.stroke();
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_core::{Node, PenId};
    use topo_render::recording::{Op, RecordingSurface};

    #[test]
    fn hidden_anchors_show_only_when_targeted() {
        let mut doc = TopologyData::new();
        let a = doc.add_pen(Pen::node(
            PenId::intern("hov_a"),
            Node::new("rectangle", Rect::new(0.0, 0.0, 100.0, 100.0)),
        ));
        doc.init_all(&ShapeRegistry::new());
        doc.get_mut(a).unwrap().as_node_mut().unwrap().rotated_anchors[1].hidden = true;

        let mut hover = HoverLayer::new();
        hover.node = Some(a);
        let mut s = RecordingSurface::new();
        hover.render(&mut s, &doc, &ShapeRegistry::new(), &Options::default());
        assert_eq!(s.count(|op| matches!(op, Op::Arc(..))), 3);

        hover.anchor = Some((a, 1));
        let mut s = RecordingSurface::new();
        hover.render(&mut s, &doc, &ShapeRegistry::new(), &Options::default());
        assert_eq!(s.count(|op| matches!(op, Op::Arc(..))), 4);
        assert_eq!(s.depth(), 0);
    }
}
