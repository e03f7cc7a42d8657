//! Docking: snapping a dragged selection to other nodes' key points.
//!
//! Targets (the x and y of every other top-level node's corners and
//! center) are collected once when a drag starts. Each move then finds,
//! per axis, the smallest gap between a target and one of the moving
//! box's key points; a gap within the threshold replaces the raw offset
//! on that axis and surfaces a guide line at the target coordinate.

use topo_core::{PenIndex, Point, Rect, TopologyData};

/// Guide lines to show while snapped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DockGuides {
    /// Vertical guide at this x.
    pub x: Option<f64>,
    /// Horizontal guide at this y.
    pub y: Option<f64>,
}

impl DockGuides {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DockHandler {
    targets: Option<(Vec<f64>, Vec<f64>)>,
}

/// Corner and center coordinates of a box, split per axis.
fn key_coords(r: &Rect) -> ([f64; 3], [f64; 3]) {
    let c = r.center();
    ([r.x, c.x, r.ex()], [r.y, c.y, r.ey()])
}

/// Closest (target, gap) pair on one axis.
fn closest(targets: &[f64], keys: &[f64; 3], delta: f64) -> Option<(f64, f64)> {
    targets
        .iter()
        .flat_map(|&t| keys.iter().map(move |&k| (t, t - (k + delta))))
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
}

impl DockHandler {
    /// Collect targets from every visible top-level node not in `exclude`.
    pub fn start(&mut self, doc: &TopologyData, exclude: &[PenIndex]) {
        let (xs, ys): (Vec<[f64; 3]>, Vec<[f64; 3]>) = doc
            .pens
            .iter()
            .filter(|idx| !exclude.contains(idx))
            .filter_map(|&idx| doc.get(idx))
            .filter(|p| p.is_node() && p.base.visible)
            .map(|p| key_coords(&p.world_bounds()))
            .unzip();
        self.targets = Some((xs.concat(), ys.concat()));
    }

    /// Adjusted offset for `moving` (the box at drag start) dragged by
    /// `(dx, dy)`, plus the guides to display.
    pub fn snap(&self, moving: &Rect, dx: f64, dy: f64, threshold: f64) -> (f64, f64, DockGuides) {
        let Some((tx, ty)) = &self.targets else {
            return (dx, dy, DockGuides::default());
        };
        let (kx, ky) = key_coords(moving);
        let mut guides = DockGuides::default();
        let mut out = (dx, dy);
        if let Some((target, gap)) = closest(tx, &kx, dx)
            && gap.abs() <= threshold
        {
            out.0 += gap;
            guides.x = Some(target);
        }
        if let Some((target, gap)) = closest(ty, &ky, dy)
            && gap.abs() <= threshold
        {
            out.1 += gap;
            guides.y = Some(target);
        }
        (out.0, out.1, guides)
    }

    pub fn cleanup(&mut self) {
        self.targets = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topo_core::{Node, Pen, PenId, ShapeRegistry};

    fn setup() -> (TopologyData, PenIndex) {
        let mut doc = TopologyData::new();
        let a = doc.add_pen(Pen::node(
            PenId::intern("dock_a"),
            Node::new("rectangle", Rect::new(0.0, 0.0, 100.0, 100.0)),
        ));
        doc.add_pen(Pen::node(
            PenId::intern("dock_b"),
            Node::new("rectangle", Rect::new(300.0, 300.0, 100.0, 100.0)),
        ));
        doc.init_all(&ShapeRegistry::new());
        (doc, a)
    }

    #[test]
    fn corner_within_threshold_snaps_exactly() {
        let (doc, a) = setup();
        let mut dock = DockHandler::default();
        dock.start(&doc, &[a]);
        let moving = Rect::new(0.0, 0.0, 100.0, 100.0);
        // Bottom-right corner lands 9px short of (300, 300) on both axes.
        let (dx, dy, guides) = dock.snap(&moving, 191.0, 191.0, 10.0);
        assert_eq!((dx, dy), (200.0, 200.0));
        assert_eq!(guides, DockGuides { x: Some(300.0), y: Some(300.0) });
    }

    #[test]
    fn corner_past_threshold_keeps_raw_offset() {
        let (doc, a) = setup();
        let mut dock = DockHandler::default();
        dock.start(&doc, &[a]);
        let moving = Rect::new(0.0, 0.0, 100.0, 100.0);
        let (dx, dy, guides) = dock.snap(&moving, 189.0, 189.0, 10.0);
        assert_eq!((dx, dy), (189.0, 189.0));
        assert!(guides.is_empty());
    }

    #[test]
    fn without_targets_nothing_snaps() {
        let dock = DockHandler::default();
        let (dx, dy, guides) = dock.snap(&Rect::new(0.0, 0.0, 1.0, 1.0), 3.0, 4.0, 10.0);
        assert_eq!((dx, dy), (3.0, 4.0));
        assert!(guides.is_empty());
    }
}
