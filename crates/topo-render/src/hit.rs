//! Hit testing: canvas point → pen lookup.
//!
//! Walks pens front-to-back (reverse paint order). A node's children are
//! tested before the node itself, so a nested child wins over its ancestor.

use topo_core::{LineEnd, PenIndex, PenKind, Point, Rect, TopologyData};

/// Which part of a line was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineHit {
    End(LineEnd),
    Control(usize),
    Body,
}

/// Topmost visible node whose (rotated) rect contains `pt`.
pub fn hit_node(doc: &TopologyData, pt: Point, padding: f64) -> Option<PenIndex> {
    doc.pens
        .iter()
        .rev()
        .find_map(|&idx| hit_node_at(doc, idx, pt, padding))
}

fn hit_node_at(doc: &TopologyData, idx: PenIndex, pt: Point, padding: f64) -> Option<PenIndex> {
    let pen = doc.get(idx)?;
    if !pen.base.visible {
        return None;
    }
    let PenKind::Node(node) = &pen.kind else {
        return None;
    };
    for &child in doc.children(idx).iter().rev() {
        if let Some(hit) = hit_node_at(doc, child, pt, padding) {
            return Some(hit);
        }
    }
    node.rect
        .hit_rotate(pt, pen.base.rotate, padding)
        .then_some(idx)
}

/// Topmost node anchor within `radius` of `pt`, as (node, anchor index).
/// Hidden anchors are skipped.
pub fn hit_node_anchor(doc: &TopologyData, pt: Point, radius: f64) -> Option<(PenIndex, usize)> {
    doc.pens
        .iter()
        .rev()
        .find_map(|&idx| hit_anchor_at(doc, idx, pt, radius))
}

fn hit_anchor_at(doc: &TopologyData, idx: PenIndex, pt: Point, radius: f64) -> Option<(PenIndex, usize)> {
    let pen = doc.get(idx)?;
    let node = pen.as_node()?;
    if !pen.base.visible {
        return None;
    }
    for &child in doc.children(idx).iter().rev() {
        if let Some(hit) = hit_anchor_at(doc, child, pt, radius) {
            return Some(hit);
        }
    }
    if node.hide_anchor {
        return None;
    }
    node.rotated_anchors
        .iter()
        .position(|a| !a.hidden && a.hit(pt, radius))
        .map(|i| (idx, i))
}

/// Topmost line whose endpoint or body is near `pt`. Endpoints win over
/// the body of the same line.
pub fn hit_line(doc: &TopologyData, pt: Point, radius: f64) -> Option<(PenIndex, LineHit)> {
    doc.pens.iter().rev().find_map(|&idx| {
        let pen = doc.get(idx)?;
        let line = pen.as_line()?;
        if !pen.base.visible {
            return None;
        }
        if let Some(end) = line.hit_end(pt, radius) {
            return Some((idx, LineHit::End(end)));
        }
        line.hit(pt, radius).then_some((idx, LineHit::Body))
    })
}

/// Control point of one specific line near `pt`.
pub fn hit_line_control(doc: &TopologyData, idx: PenIndex, pt: Point, radius: f64) -> Option<usize> {
    doc.get(idx)?.as_line()?.hit_control(pt, radius)
}

/// Top-level pens lying entirely inside `rect` (marquee selection).
pub fn pens_in_rect(doc: &TopologyData, rect: &Rect) -> Vec<PenIndex> {
    doc.pens
        .iter()
        .copied()
        .filter(|&idx| {
            doc.get(idx)
                .is_some_and(|p| p.base.visible && rect.contains_rect(&p.world_bounds()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topo_core::{Line, LineKind, Node, Pen, PenId, ShapeRegistry};

    fn doc() -> (TopologyData, PenIndex, PenIndex, PenIndex) {
        let registry = ShapeRegistry::new();
        let mut doc = TopologyData::new();
        let a = doc.add_pen(Pen::node(
            PenId::intern("hit_a"),
            Node::new("rectangle", Rect::new(0.0, 0.0, 100.0, 100.0)),
        ));
        let child = doc.add_child(
            a,
            Pen::node(PenId::intern("hit_child"), Node::new("rectangle", Rect::new(10.0, 10.0, 20.0, 20.0))),
        );
        let l = doc.add_pen(Pen::line(
            PenId::intern("hit_l"),
            Line::new(LineKind::Straight, Point::new(200.0, 0.0), Point::new(300.0, 0.0)),
        ));
        doc.init_all(&registry);
        (doc, a, child, l)
    }

    #[test]
    fn child_is_picked_before_parent() {
        let (doc, a, child, _) = doc();
        assert_eq!(hit_node(&doc, Point::new(15.0, 15.0), 0.0), Some(child));
        assert_eq!(hit_node(&doc, Point::new(80.0, 80.0), 0.0), Some(a));
        assert_eq!(hit_node(&doc, Point::new(150.0, 150.0), 0.0), None);
    }

    #[test]
    fn rotated_node_hit_uses_its_frame() {
        let (mut doc, a, _, _) = doc();
        doc.get_mut(a).unwrap().as_node_mut().unwrap().rect = Rect::new(0.0, 40.0, 100.0, 20.0);
        doc.get_mut(a).unwrap().base.rotate = 90.0;
        // Turned upright about (50, 50): spans y 0..100 at x 40..60.
        assert_eq!(hit_node(&doc, Point::new(50.0, 5.0), 0.0), Some(a));
        assert_eq!(hit_node(&doc, Point::new(5.0, 50.0), 0.0), None);
    }

    #[test]
    fn line_ends_beat_body() {
        let (doc, _, _, l) = doc();
        assert_eq!(hit_line(&doc, Point::new(298.0, 1.0), 5.0), Some((l, LineHit::End(LineEnd::To))));
        assert_eq!(hit_line(&doc, Point::new(250.0, 3.0), 5.0), Some((l, LineHit::Body)));
        assert_eq!(hit_line(&doc, Point::new(250.0, 30.0), 5.0), None);
    }

    #[test]
    fn anchors_and_marquee() {
        let (doc, a, _, l) = doc();
        // Right-side midpoint of the parent.
        assert_eq!(hit_node_anchor(&doc, Point::new(101.0, 50.0), 5.0), Some((a, 2)));
        assert_eq!(pens_in_rect(&doc, &Rect::new(-1.0, -1.0, 500.0, 200.0)), vec![a, l]);
        assert_eq!(pens_in_rect(&doc, &Rect::new(150.0, -10.0, 200.0, 20.0)), vec![l]);
    }
}
