//! Selection layer.
//!
//! Owns the current selection, its box and handles, and applies move,
//! resize and rotate gestures. Every gesture frame is computed from the
//! pens as they were saved when the gesture began, so intermediate frames
//! can be discarded (or the whole gesture cancelled) without drift.
//!
//! After each frame the moved nodes' children are re-placed and every line
//! docked to them is refreshed from their rotated anchors.

use std::collections::HashSet;
use topo_core::geometry::angle_between;
use topo_core::{
    LineEnd, Pen, PenId, PenIndex, PenKind, Point, Rect, ShapeRegistry, Surface, TopologyData,
};
use topo_render::StateGuard;

use crate::options::Options;

/// Screen positions of the selection handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handles {
    /// Resize handles: top-left, top-right, bottom-right, bottom-left.
    pub corners: [Point; 4],
    pub rotate: Point,
    pub center: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Top,
    Bottom,
    /// Horizontal centers.
    Center,
    /// Vertical centers.
    Middle,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveLayer {
    pens: Vec<PenIndex>,
    rect: Rect,
    /// Rotation of the box: a single node's own rotation, zero for groups.
    angle: f64,
    /// Group rotation shown during a gesture, folded in by `update_rotate`.
    pending_rotate: f64,
    saved: Vec<(PenIndex, Pen)>,
    saved_rect: Rect,
    saved_angle: f64,
}

impl ActiveLayer {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn pens(&self) -> &[PenIndex] {
        &self.pens
    }

    pub fn is_empty(&self) -> bool {
        self.pens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pens.len()
    }

    pub fn contains(&self, idx: PenIndex) -> bool {
        self.pens.contains(&idx)
    }

    pub fn set(&mut self, doc: &TopologyData, pens: Vec<PenIndex>) {
        self.pens = pens;
        self.update_rect(doc);
    }

    /// Shift-click: add or remove one pen.
    pub fn toggle(&mut self, doc: &TopologyData, idx: PenIndex) {
        if let Some(pos) = self.pens.iter().position(|&p| p == idx) {
            self.pens.remove(pos);
        } else {
            self.pens.push(idx);
        }
        self.update_rect(doc);
    }

    pub fn clear(&mut self) {
        self.pens.clear();
        self.saved.clear();
        self.rect = Rect::default();
        self.angle = 0.0;
        self.pending_rotate = 0.0;
    }

    /// The only selected pen, if exactly one is selected.
    pub fn single(&self) -> Option<PenIndex> {
        match self.pens.as_slice() {
            [one] => Some(*one),
            _ => None,
        }
    }

    pub fn ids(&self, doc: &TopologyData) -> Vec<PenId> {
        self.pens
            .iter()
            .filter_map(|&i| doc.get(i).map(|p| p.id))
            .collect()
    }

    /// Whether every selected pen may be moved.
    pub fn movable(&self, doc: &TopologyData) -> bool {
        !self.pens.is_empty()
            && self
                .pens
                .iter()
                .all(|&i| doc.get(i).is_some_and(|p| !p.base.locked))
    }

    /// Recompute the box from the pens' current geometry. A single node
    /// keeps its own rect and rotation; anything else gets the
    /// axis-aligned box around every rotated corner.
    pub fn update_rect(&mut self, doc: &TopologyData) {
        self.pens.retain(|&i| doc.get(i).is_some());
        self.pending_rotate = 0.0;
        if let Some(pen) = self.single().and_then(|i| doc.get(i))
            && let PenKind::Node(node) = &pen.kind
        {
            self.rect = node.rect;
            self.angle = pen.base.rotate;
            return;
        }
        let points: Vec<Point> = self
            .pens
            .iter()
            .filter_map(|&i| doc.get(i))
            .flat_map(|p| p.world_points())
            .collect();
        self.rect = Rect::bounding(points);
        self.angle = 0.0;
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn angle(&self) -> f64 {
        self.angle + self.pending_rotate
    }

    pub fn pending_rotate(&self) -> f64 {
        self.pending_rotate
    }

    // ─── Handles ─────────────────────────────────────────────────────────

    pub fn handles(&self, opts: &Options) -> Handles {
        let angle = self.angle();
        let center = self.rect.center();
        let mut rotate = Point::new(center.x, self.rect.y - opts.rotate_handle_offset);
        rotate.rotate(angle, center);
        Handles {
            corners: self.rect.rotated_points(angle),
            rotate,
            center,
        }
    }

    /// Whether the selection shows box handles at all. A lone line is
    /// edited through its endpoints instead.
    fn has_box(&self, doc: &TopologyData) -> bool {
        !self.pens.is_empty() && !self.single().and_then(|i| doc.get(i)).is_some_and(Pen::is_line)
    }

    pub fn hit_rotate_handle(&self, doc: &TopologyData, pt: Point, opts: &Options) -> bool {
        !opts.hide_rotate_handle
            && self.has_box(doc)
            && self.handles(opts).rotate.hit(pt, opts.handle_padding)
    }

    pub fn hit_resize_handle(&self, doc: &TopologyData, pt: Point, opts: &Options) -> Option<usize> {
        if opts.hide_size_handles || !self.has_box(doc) {
            return None;
        }
        self.handles(opts)
            .corners
            .iter()
            .position(|c| c.hit(pt, opts.handle_padding))
    }

    // ─── Gesture bookkeeping ─────────────────────────────────────────────

    /// Selected pens without a selected ancestor.
    fn roots(&self, doc: &TopologyData) -> Vec<PenIndex> {
        self.pens
            .iter()
            .copied()
            .filter(|&i| {
                let mut cur = doc.parent(i);
                while let Some(p) = cur {
                    if self.pens.contains(&p) {
                        return false;
                    }
                    cur = doc.parent(p);
                }
                true
            })
            .collect()
    }

    /// Ids of every selected node and its descendants.
    pub fn moved_ids(&self, doc: &TopologyData) -> HashSet<PenId> {
        self.roots(doc)
            .into_iter()
            .flat_map(|i| doc.descendants(i))
            .filter_map(|i| doc.get(i))
            .filter(|p| p.is_node())
            .map(|p| p.id)
            .collect()
    }

    /// Snapshot the selection, its descendants and the lines docked to
    /// them before a gesture.
    pub fn save(&mut self, doc: &TopologyData) {
        let ids = self.moved_ids(doc);
        let mut indices: Vec<PenIndex> = self
            .roots(doc)
            .into_iter()
            .flat_map(|i| doc.descendants(i))
            .collect();
        for (idx, _) in doc.lines_docked_to(&ids) {
            if !indices.contains(&idx) {
                indices.push(idx);
            }
        }
        self.saved = indices
            .into_iter()
            .filter_map(|i| doc.get(i).map(|p| (i, p.clone())))
            .collect();
        self.saved_rect = self.rect;
        self.saved_angle = self.angle;
        self.pending_rotate = 0.0;
    }

    pub fn saved_rect(&self) -> Rect {
        self.saved_rect
    }

    fn saved_pen(&self, idx: PenIndex) -> Option<&Pen> {
        self.saved.iter().find(|(i, _)| *i == idx).map(|(_, p)| p)
    }

    /// Put every saved pen back (gesture cancelled).
    pub fn restore(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry) {
        for (idx, pen) in std::mem::take(&mut self.saved) {
            if let Some(slot) = doc.get_mut(idx) {
                *slot = pen;
            }
        }
        for idx in self.roots(doc) {
            doc.init_pen(idx, registry);
        }
        self.update_rect(doc);
    }

    /// Apply `f` to a fresh copy of each saved root, then re-init it and
    /// refresh docked lines.
    fn apply_from_saved(
        &mut self,
        doc: &mut TopologyData,
        registry: &ShapeRegistry,
        mut f: impl FnMut(&mut Pen, &HashSet<PenId>),
    ) {
        let ids = self.moved_ids(doc);
        for idx in self.roots(doc) {
            let Some(mut pen) = self.saved_pen(idx).cloned() else {
                continue;
            };
            f(&mut pen, &ids);
            if let Some(slot) = doc.get_mut(idx) {
                *slot = pen;
            }
            doc.init_pen(idx, registry);
        }
        doc.update_docked_lines(&ids);
    }

    // ─── Transforms ──────────────────────────────────────────────────────

    /// Move the selection by `(dx, dy)` from where it was saved.
    pub fn translate(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry, dx: f64, dy: f64) {
        self.apply_from_saved(doc, registry, |pen, ids| match &mut pen.kind {
            PenKind::Node(node) => node.rect.translate(dx, dy),
            PenKind::Line(line) => {
                line.translate(dx, dy);
                // Ends stay docked only to nodes moving along with them.
                for end in [LineEnd::From, LineEnd::To] {
                    if !line.end(end).owner.is_some_and(|o| ids.contains(&o)) {
                        line.end_mut(end).undock();
                    }
                }
            }
        });
        let mut rect = self.saved_rect;
        rect.translate(dx, dy);
        self.rect = rect;
    }

    /// Drag corner `handle` by `(dx, dy)` from where it was saved; the
    /// opposite corner stays put.
    pub fn resize(
        &mut self,
        doc: &mut TopologyData,
        registry: &ShapeRegistry,
        handle: usize,
        dx: f64,
        dy: f64,
        min_size: f64,
    ) {
        let old = self.saved_rect;
        let angle = self.saved_angle;
        let center = old.center();
        let corner = old.rotated_points(angle)[handle % 4];
        let mut local = Point::new(corner.x + dx, corner.y + dy);
        local.rotate(-angle, center);

        let opposite = (handle + 2) % 4;
        let fixed = old.to_points()[opposite];
        let (x0, x1) = if matches!(handle, 1 | 2) {
            (fixed.x, local.x.max(fixed.x + min_size))
        } else {
            (local.x.min(fixed.x - min_size), fixed.x)
        };
        let (y0, y1) = if matches!(handle, 2 | 3) {
            (fixed.y, local.y.max(fixed.y + min_size))
        } else {
            (local.y.min(fixed.y - min_size), fixed.y)
        };
        let mut new = Rect::new(x0, y0, x1 - x0, y1 - y0);
        if angle % 360.0 != 0.0 {
            let before = old.rotated_points(angle)[opposite];
            let after = new.rotated_points(angle)[opposite];
            new.translate(before.x - after.x, before.y - after.y);
        }

        let sx = if old.width > 0.0 { new.width / old.width } else { 1.0 };
        let sy = if old.height > 0.0 { new.height / old.height } else { 1.0 };
        let map = move |p: &mut Point| {
            p.x = new.x + (p.x - old.x) * sx;
            p.y = new.y + (p.y - old.y) * sy;
        };
        let single = self.single().is_some();
        self.apply_from_saved(doc, registry, |pen, _| match &mut pen.kind {
            PenKind::Node(node) if single => node.rect = new,
            PenKind::Node(node) => {
                let r = node.rect;
                node.rect = Rect::new(
                    new.x + (r.x - old.x) * sx,
                    new.y + (r.y - old.y) * sy,
                    r.width * sx,
                    r.height * sy,
                );
            }
            PenKind::Line(line) => {
                map(line.from_mut());
                map(line.to_mut());
                for cp in line.controls_mut().iter_mut() {
                    map(cp);
                }
            }
        });
        self.rect = new;
    }

    /// Rotate the selection about its box center so the handle follows
    /// the pointer from `start` to `pt`.
    pub fn rotate(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry, start: Point, pt: Point) {
        let center = self.saved_rect.center();
        let delta = angle_between(center, pt) - angle_between(center, start);
        self.rotate_by(doc, registry, delta);
    }

    /// Rotate the selection `delta` degrees about its saved box center.
    pub fn rotate_by(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry, delta: f64) {
        let center = self.saved_rect.center();
        self.apply_from_saved(doc, registry, |pen, _| {
            let is_node = match &mut pen.kind {
                PenKind::Node(node) => {
                    let mut c = node.rect.center();
                    c.rotate(delta, center);
                    node.rect.set_center(c);
                    true
                }
                PenKind::Line(line) => {
                    line.rotate(delta, center);
                    false
                }
            };
            // Lines carry their rotation in their points.
            if is_node {
                pen.base.rotate += delta;
            }
        });
        if self.single().is_some() {
            self.angle = self.saved_angle + delta;
        } else {
            self.pending_rotate = delta;
        }
    }

    /// Commit a group rotation: fold the pending offset into the box.
    pub fn update_rotate(&mut self, doc: &TopologyData) {
        self.pending_rotate = 0.0;
        self.update_rect(doc);
    }

    // ─── Arrangement ─────────────────────────────────────────────────────

    fn shift_nodes(
        &mut self,
        doc: &mut TopologyData,
        registry: &ShapeRegistry,
        moves: Vec<(PenIndex, f64, f64)>,
    ) -> bool {
        if moves.iter().all(|&(_, dx, dy)| dx == 0.0 && dy == 0.0) {
            return false;
        }
        for (idx, dx, dy) in moves {
            if let Some(node) = doc.get_mut(idx).and_then(Pen::as_node_mut) {
                node.rect.translate(dx, dy);
            }
            doc.init_pen(idx, registry);
        }
        let ids = self.moved_ids(doc);
        doc.update_docked_lines(&ids);
        self.update_rect(doc);
        true
    }

    fn root_nodes(&self, doc: &TopologyData) -> Vec<(PenIndex, Rect)> {
        self.roots(doc)
            .into_iter()
            .filter_map(|i| doc.get(i).filter(|p| p.is_node()).map(|p| (i, p.world_bounds())))
            .collect()
    }

    /// Align selected nodes to an edge or center of the selection box.
    pub fn align(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry, how: Align) -> bool {
        if self.pens.len() < 2 {
            return false;
        }
        let b = self.rect;
        let c = b.center();
        let moves = self
            .root_nodes(doc)
            .into_iter()
            .map(|(idx, r)| {
                let rc = r.center();
                let (dx, dy) = match how {
                    Align::Left => (b.x - r.x, 0.0),
                    Align::Right => (b.ex() - r.ex(), 0.0),
                    Align::Top => (0.0, b.y - r.y),
                    Align::Bottom => (0.0, b.ey() - r.ey()),
                    Align::Center => (c.x - rc.x, 0.0),
                    Align::Middle => (0.0, c.y - rc.y),
                };
                (idx, dx, dy)
            })
            .collect();
        self.shift_nodes(doc, registry, moves)
    }

    /// Distribute selected nodes so the gaps between them are equal.
    pub fn space_between(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry, horizontal: bool) -> bool {
        let mut nodes = self.root_nodes(doc);
        if nodes.len() < 3 {
            return false;
        }
        let key = |r: &Rect| if horizontal { r.x } else { r.y };
        let extent = |r: &Rect| if horizontal { r.width } else { r.height };
        nodes.sort_by(|a, b| key(&a.1).total_cmp(&key(&b.1)));

        let b = self.rect;
        let total: f64 = nodes.iter().map(|(_, r)| extent(r)).sum();
        let span = if horizontal { b.width } else { b.height };
        let gap = (span - total) / (nodes.len() - 1) as f64;

        let mut cursor = key(&b);
        let mut moves = Vec::with_capacity(nodes.len());
        for (idx, r) in nodes {
            let d = cursor - key(&r);
            moves.push(if horizontal { (idx, d, 0.0) } else { (idx, 0.0, d) });
            cursor += extent(&r) + gap;
        }
        self.shift_nodes(doc, registry, moves)
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    pub fn render(&self, surface: &mut dyn Surface, doc: &TopologyData, opts: &Options) {
        if self.pens.is_empty() {
            return;
        }
        let mut s = StateGuard::new(surface);
        s.set_stroke_style(&opts.active_color);
        s.set_fill_style("#ffffff");
        s.set_line_width(1.0);

        if let Some(line) = self.single().and_then(|i| doc.get(i)).and_then(Pen::as_line) {
            for p in [line.from(), line.to()].into_iter().chain(line.controls()) {
                s.begin_path();
                s.arc(p.x, p.y, opts.anchor_radius, 0.0, std::f64::consts::TAU);
                s.fill();
                s.stroke();
            }
            return;
        }

        let h = self.handles(opts);
        s.set_line_dash(&[4.0, 4.0]);
        s.begin_path();
        s.move_to(h.corners[0].x, h.corners[0].y);
        for c in &h.corners[1..] {
            s.line_to(c.x, c.y);
        }
        s.close_path();
        s.stroke();
        s.set_line_dash(&[]);

        if !opts.hide_size_handles {
            let half = opts.handle_padding;
            for c in &h.corners {
                s.begin_path();
                s.rect(c.x - half, c.y - half, half * 2.0, half * 2.0);
                s.fill();
                s.stroke();
            }
        }
        if !opts.hide_rotate_handle {
            s.begin_path();
            s.arc(h.rotate.x, h.rotate.y, opts.handle_padding, 0.0, std::f64::consts::TAU);
            s.fill();
            s.stroke();
        }
    }
}
