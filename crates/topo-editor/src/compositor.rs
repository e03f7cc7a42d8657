//! Stacks the document and the three overlay layers into one frame.
//!
//! Redraws are event-driven: callers mark what changed and `paint` does
//! nothing until something is dirty. A paint always visits every layer in
//! order (background, static pens, animate, active, hover) since the
//! target surface is a single immediate-mode canvas.

use topo_core::{Rect, ShapeRegistry, Surface, TopologyData};
use topo_render::render_pens;

use crate::active::ActiveLayer;
use crate::animate::AnimateLayer;
use crate::hover::HoverLayer;
use crate::options::Options;

const GRID_STEP: f64 = 10.0;
const GRID_COLOR: &str = "#e2e2e2";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dirty {
    pub content: bool,
    pub animate: bool,
    pub active: bool,
    pub hover: bool,
}

impl Dirty {
    pub fn any(&self) -> bool {
        self.content || self.animate || self.active || self.hover
    }
}

/// The layers a frame is built from.
pub struct Layers<'a> {
    pub animate: &'a AnimateLayer,
    pub active: &'a ActiveLayer,
    pub hover: &'a HoverLayer,
}

#[derive(Debug, Clone, Default)]
pub struct Compositor {
    dirty: Dirty,
    /// Area cleared before each frame, in document coordinates.
    viewport: Rect,
}

impl Compositor {
    pub fn new(viewport: Rect) -> Self {
        Self {
            dirty: Dirty {
                content: true,
                ..Dirty::default()
            },
            viewport,
        }
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.dirty.content = true;
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    pub fn mark_content(&mut self) {
        self.dirty.content = true;
    }

    pub fn mark_animate(&mut self) {
        self.dirty.animate = true;
    }

    pub fn mark_active(&mut self) {
        self.dirty.active = true;
    }

    pub fn mark_hover(&mut self) {
        self.dirty.hover = true;
    }

    pub fn mark_all(&mut self) {
        self.dirty = Dirty {
            content: true,
            animate: true,
            active: true,
            hover: true,
        };
    }

    /// Compose a frame if anything is dirty. Returns whether it painted.
    pub fn paint(
        &mut self,
        surface: &mut dyn Surface,
        doc: &TopologyData,
        registry: &ShapeRegistry,
        layers: Layers<'_>,
        opts: &Options,
    ) -> bool {
        if !self.dirty.any() {
            return false;
        }
        log::trace!("compose {:?}", self.dirty);
        self.dirty = Dirty::default();

        self.background(surface, doc);
        render_pens(surface, doc, registry, |idx| layers.animate.owns(idx));
        layers.animate.render(surface, doc, registry);
        layers.active.render(surface, doc, opts);
        layers.hover.render(surface, doc, registry, opts);
        true
    }

    fn background(&self, surface: &mut dyn Surface, doc: &TopologyData) {
        let v = self.viewport;
        surface.clear_rect(v.x, v.y, v.width, v.height);
        if let Some(color) = &doc.bk_color {
            surface.save();
            surface.set_fill_style(color);
            surface.begin_path();
            surface.rect(v.x, v.y, v.width, v.height);
            surface.fill();
            surface.restore();
        }
        if doc.grid {
            surface.save();
            surface.set_stroke_style(GRID_COLOR);
            surface.set_line_width(1.0);
            surface.begin_path();
            let mut x = (v.x / GRID_STEP).ceil() * GRID_STEP;
            while x <= v.ex() {
                surface.move_to(x, v.y);
                surface.line_to(x, v.ey());
                x += GRID_STEP;
            }
            let mut y = (v.y / GRID_STEP).ceil() * GRID_STEP;
            while y <= v.ey() {
                surface.move_to(v.x, y);
                surface.line_to(v.ex(), y);
                y += GRID_STEP;
            }
            surface.stroke();
            surface.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topo_core::{Node, Pen, PenId};
    use topo_render::recording::{Op, RecordingSurface};

    #[test]
    fn clean_compositor_skips_the_frame() {
        let doc = TopologyData::new();
        let registry = ShapeRegistry::new();
        let (animate, active, hover) = (AnimateLayer::default(), ActiveLayer::new(), HoverLayer::new());
        let mut comp = Compositor::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let mut s = RecordingSurface::new();
        let layers = || Layers {
            animate: &animate,
            active: &active,
            hover: &hover,
        };
        assert!(comp.paint(&mut s, &doc, &registry, layers(), &Options::default()));
        let ops = s.ops.len();
        assert!(!comp.paint(&mut s, &doc, &registry, layers(), &Options::default()));
        assert_eq!(s.ops.len(), ops);
    }

    #[test]
    fn frame_starts_with_clear_and_stays_balanced() {
        let mut doc = TopologyData::new();
        doc.add_pen(Pen::node(
            PenId::intern("comp_a"),
            Node::new("rectangle", Rect::new(0.0, 0.0, 10.0, 10.0)),
        ));
        doc.bk_color = Some("#ffffff".into());
        doc.grid = true;
        let registry = ShapeRegistry::new();
        doc.init_all(&registry);
        let (animate, active, hover) = (AnimateLayer::default(), ActiveLayer::new(), HoverLayer::new());
        let mut comp = Compositor::new(Rect::new(0.0, 0.0, 50.0, 50.0));
        let mut s = RecordingSurface::new();
        comp.mark_all();
        let layers = Layers {
            animate: &animate,
            active: &active,
            hover: &hover,
        };
        comp.paint(&mut s, &doc, &registry, layers, &Options::default());
        assert_eq!(s.ops[0], Op::ClearRect(0.0, 0.0, 50.0, 50.0));
        assert_eq!(s.depth(), 0);
    }
}
