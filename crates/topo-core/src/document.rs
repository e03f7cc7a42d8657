//! The document: an arena of pens plus global defaults.
//!
//! Pens live in a `StableDiGraph` so their [`PenIndex`] keys survive
//! removals elsewhere in the document. Edges go from parent node to child
//! node; the paint order of siblings is kept in explicit lists.

use crate::geometry::{Point, Rect};
use crate::id::PenId;
use crate::line::{LineEnd, LineKind};
use crate::pen::{Pen, PenIndex};
use crate::registry::ShapeRegistry;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Document lock level. Serialized as its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Lock {
    #[default]
    None,
    /// No mutation of any kind.
    Readonly,
    /// Selection allowed, geometry gestures are not.
    NoMove,
    /// Pointer input is ignored entirely.
    NoEvent,
}

impl Lock {
    /// Whether the document accepts mutations.
    pub fn editable(self) -> bool {
        self == Lock::None
    }
}

impl TryFrom<u8> for Lock {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Lock::None),
            1 => Ok(Lock::Readonly),
            2 => Ok(Lock::NoMove),
            10 => Ok(Lock::NoEvent),
            other => Err(format!("unknown lock level {other}")),
        }
    }
}

impl From<Lock> for u8 {
    fn from(lock: Lock) -> u8 {
        match lock {
            Lock::None => 0,
            Lock::Readonly => 1,
            Lock::NoMove => 2,
            Lock::NoEvent => 10,
        }
    }
}

/// The live document.
#[derive(Debug, Clone)]
pub struct TopologyData {
    pub graph: StableDiGraph<Pen, ()>,
    /// Top-level pens in paint order (last is topmost).
    pub pens: Vec<PenIndex>,
    /// Children of each parent node in paint order.
    pub(crate) child_order: HashMap<PenIndex, Vec<PenIndex>>,
    pub id_index: HashMap<PenId, PenIndex>,
    /// Kind given to newly drawn lines.
    pub line_kind: LineKind,
    pub from_arrow: Option<String>,
    pub to_arrow: Option<String>,
    pub scale: f64,
    pub locked: Lock,
    pub bk_color: Option<String>,
    pub grid: bool,
}

impl Default for TopologyData {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyData {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            pens: Vec::new(),
            child_order: HashMap::new(),
            id_index: HashMap::new(),
            line_kind: LineKind::Curve,
            from_arrow: None,
            to_arrow: Some("triangleSolid".into()),
            scale: 1.0,
            locked: Lock::None,
            bk_color: None,
            grid: false,
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    // ─── Insertion & removal ─────────────────────────────────────────────

    fn insert(&mut self, mut pen: Pen) -> PenIndex {
        if self.id_index.contains_key(&pen.id) {
            let fresh = PenId::fresh();
            log::warn!("duplicate pen id {}; renamed to {fresh}", pen.id);
            pen.id = fresh;
        }
        let id = pen.id;
        let idx = self.graph.add_node(pen);
        self.id_index.insert(id, idx);
        idx
    }

    /// Add a pen on top of the top-level z-order.
    pub fn add_pen(&mut self, pen: Pen) -> PenIndex {
        let idx = self.insert(pen);
        self.pens.push(idx);
        idx
    }

    /// Add a node as the last child of `parent`.
    pub fn add_child(&mut self, parent: PenIndex, pen: Pen) -> PenIndex {
        let idx = self.insert(pen);
        self.attach_child(parent, idx);
        idx
    }

    /// Remove a pen and everything nested under it. Returns the removed
    /// pens, parent first.
    pub fn remove(&mut self, idx: PenIndex) -> Vec<Pen> {
        if !self.graph.contains_node(idx) {
            return Vec::new();
        }
        self.detach(idx);
        let mut removed = Vec::new();
        for i in self.descendants(idx) {
            self.child_order.remove(&i);
            if let Some(pen) = self.graph.remove_node(i) {
                self.id_index.remove(&pen.id);
                removed.push(pen);
            }
        }
        removed
    }

    /// Unlink a pen from its parent (or from the top level) without
    /// deleting it.
    pub fn detach(&mut self, idx: PenIndex) {
        if let Some(parent) = self.parent(idx) {
            if let Some(edge) = self.graph.find_edge(parent, idx) {
                self.graph.remove_edge(edge);
            }
            if let Some(order) = self.child_order.get_mut(&parent) {
                order.retain(|&c| c != idx);
            }
        } else {
            self.pens.retain(|&p| p != idx);
        }
    }

    /// Put a detached pen back at the top level, above everything.
    pub fn attach_top(&mut self, idx: PenIndex) {
        self.pens.push(idx);
    }

    pub fn attach_child(&mut self, parent: PenIndex, idx: PenIndex) {
        self.graph.add_edge(parent, idx, ());
        self.child_order.entry(parent).or_default().push(idx);
    }

    /// Drop every pen.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.pens.clear();
        self.child_order.clear();
        self.id_index.clear();
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn get(&self, idx: PenIndex) -> Option<&Pen> {
        self.graph.node_weight(idx)
    }

    pub fn get_mut(&mut self, idx: PenIndex) -> Option<&mut Pen> {
        self.graph.node_weight_mut(idx)
    }

    pub fn index_of(&self, id: PenId) -> Option<PenIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn get_by_id(&self, id: PenId) -> Option<&Pen> {
        self.index_of(id).and_then(|idx| self.get(idx))
    }

    pub fn parent(&self, idx: PenIndex) -> Option<PenIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Children in paint order.
    pub fn children(&self, idx: PenIndex) -> &[PenIndex] {
        self.child_order
            .get(&idx)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// `idx` followed by all of its descendants, depth-first pre-order.
    pub fn descendants(&self, idx: PenIndex) -> Vec<PenIndex> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.children(i).iter().rev().copied());
        }
        out
    }

    /// Every pen in paint order.
    pub fn walk(&self) -> Vec<PenIndex> {
        self.pens.iter().flat_map(|&p| self.descendants(p)).collect()
    }

    pub fn lines(&self) -> impl Iterator<Item = PenIndex> + '_ {
        self.pens
            .iter()
            .copied()
            .filter(|&i| self.graph[i].is_line())
    }

    /// All pens carrying `tag`, scanning the arena.
    pub fn find_by_tag(&self, tag: &str) -> Vec<PenIndex> {
        self.walk()
            .into_iter()
            .filter(|&i| self.graph[i].has_tag(tag))
            .collect()
    }

    /// Bounding box of every top-level pen as drawn.
    pub fn bounds(&self) -> Rect {
        let points: Vec<Point> = self
            .pens
            .iter()
            .flat_map(|&i| self.graph[i].world_points())
            .collect();
        Rect::bounding(points)
    }

    // ─── Z-order (top level) ─────────────────────────────────────────────

    fn z_position(&self, idx: PenIndex) -> Option<usize> {
        self.pens.iter().position(|&p| p == idx)
    }

    pub fn bring_to_front(&mut self, idx: PenIndex) -> bool {
        match self.z_position(idx) {
            Some(pos) if pos + 1 < self.pens.len() => {
                let p = self.pens.remove(pos);
                self.pens.push(p);
                true
            }
            _ => false,
        }
    }

    pub fn send_to_back(&mut self, idx: PenIndex) -> bool {
        match self.z_position(idx) {
            Some(pos) if pos > 0 => {
                let p = self.pens.remove(pos);
                self.pens.insert(0, p);
                true
            }
            _ => false,
        }
    }

    pub fn bring_forward(&mut self, idx: PenIndex) -> bool {
        match self.z_position(idx) {
            Some(pos) if pos + 1 < self.pens.len() => {
                self.pens.swap(pos, pos + 1);
                true
            }
            _ => false,
        }
    }

    pub fn send_backward(&mut self, idx: PenIndex) -> bool {
        match self.z_position(idx) {
            Some(pos) if pos > 0 => {
                self.pens.swap(pos, pos - 1);
                true
            }
            _ => false,
        }
    }

    // ─── Derived state ───────────────────────────────────────────────────

    /// Re-run `init` on a pen and cascade layout into its children.
    pub fn init_pen(&mut self, idx: PenIndex, registry: &ShapeRegistry) {
        if let Some(pen) = self.get_mut(idx) {
            pen.init(registry);
        }
        self.calc_child_rect(idx, registry);
    }

    /// Recompute every pen's cached geometry.
    pub fn init_all(&mut self, registry: &ShapeRegistry) {
        for idx in self.pens.clone() {
            self.init_pen(idx, registry);
        }
    }

    /// Top-level lines with an endpoint docked to any node in `nodes`.
    pub fn lines_docked_to(&self, nodes: &HashSet<PenId>) -> Vec<(PenIndex, LineEnd)> {
        let mut out = Vec::new();
        for idx in self.lines() {
            let Some(line) = self.graph[idx].as_line() else {
                continue;
            };
            for end in [LineEnd::From, LineEnd::To] {
                if line.end(end).owner.is_some_and(|o| nodes.contains(&o)) {
                    out.push((idx, end));
                }
            }
        }
        out
    }

    /// Refresh docked endpoints of every line attached to `nodes` from
    /// their owners' rotated anchors.
    ///
    /// Control points are recomputed, except for user-placed ones on a
    /// line whose ends are both still docked: those only shift along with
    /// the endpoint next to them.
    pub fn update_docked_lines(&mut self, nodes: &HashSet<PenId>) {
        let attached = self.lines_docked_to(nodes);
        let mut touched: Vec<PenIndex> = Vec::new();
        for (idx, end) in attached {
            let Some(owner) = self.graph[idx].as_line().and_then(|l| l.end(end).owner) else {
                continue;
            };
            let anchor_index = self.graph[idx]
                .as_line()
                .and_then(|l| l.end(end).anchor_index);
            let anchor = self
                .get_by_id(owner)
                .and_then(|p| p.as_node())
                .and_then(|n| anchor_index.and_then(|i| n.rotated_anchors.get(i)))
                .copied();
            let Some(line) = self.graph[idx].as_line_mut() else {
                continue;
            };
            match anchor {
                Some(anchor) => {
                    let old = *line.end(end);
                    let (dx, dy) = (anchor.x - old.x, anchor.y - old.y);
                    let p = line.end_mut(end);
                    p.x = anchor.x;
                    p.y = anchor.y;
                    p.direction = anchor.direction;
                    if line.manual_cps {
                        let cps = line.controls_mut();
                        let adjacent = match end {
                            LineEnd::From => cps.first_mut(),
                            LineEnd::To => cps.last_mut(),
                        };
                        if let Some(cp) = adjacent {
                            cp.translate(dx, dy);
                        }
                    }
                }
                None => {
                    log::warn!("anchor {anchor_index:?} of {owner} vanished; undocking");
                    line.end_mut(end).undock();
                }
            }
            if !touched.contains(&idx) {
                touched.push(idx);
            }
        }
        for idx in touched {
            if let Some(line) = self.graph[idx].as_line_mut() {
                let both_docked = line.from().is_docked() && line.to().is_docked();
                if !(line.manual_cps && both_docked) {
                    line.calc_control_points();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::line::Line;
    use crate::node::Node;
    use pretty_assertions::assert_eq;

    fn node(id: &str, x: f64) -> Pen {
        Pen::node(PenId::intern(id), Node::new("rectangle", Rect::new(x, 0.0, 100.0, 100.0)))
    }

    #[test]
    fn remove_takes_descendants() {
        let mut doc = TopologyData::new();
        let parent = doc.add_pen(node("doc_parent", 0.0));
        let child = doc.add_child(parent, node("doc_child", 10.0));
        let _grandchild = doc.add_child(child, node("doc_grandchild", 20.0));
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.parent(child), Some(parent));

        let removed = doc.remove(parent);
        assert_eq!(removed.len(), 3);
        assert!(doc.is_empty());
        assert!(doc.pens.is_empty());
        assert_eq!(doc.index_of(PenId::intern("doc_child")), None);
    }

    #[test]
    fn children_keep_insertion_order_after_reuse() {
        let mut doc = TopologyData::new();
        let parent = doc.add_pen(node("ord_parent", 0.0));
        let a = doc.add_child(parent, node("ord_a", 0.0));
        let b = doc.add_child(parent, node("ord_b", 0.0));
        doc.remove(a);
        let c = doc.add_child(parent, node("ord_c", 0.0));
        assert_eq!(doc.children(parent), &[b, c]);
    }

    #[test]
    fn z_order_moves() {
        let mut doc = TopologyData::new();
        let a = doc.add_pen(node("z_a", 0.0));
        let b = doc.add_pen(node("z_b", 0.0));
        let c = doc.add_pen(node("z_c", 0.0));
        assert!(doc.send_to_back(c));
        assert_eq!(doc.pens, vec![c, a, b]);
        assert!(doc.bring_forward(c));
        assert_eq!(doc.pens, vec![a, c, b]);
        assert!(!doc.bring_to_front(b));
        assert!(doc.send_backward(b));
        assert_eq!(doc.pens, vec![a, b, c]);
    }

    #[test]
    fn duplicate_ids_are_renamed() {
        let mut doc = TopologyData::new();
        doc.add_pen(node("dup", 0.0));
        let second = doc.add_pen(node("dup", 0.0));
        assert_ne!(doc.graph[second].id, PenId::intern("dup"));
        assert_eq!(doc.id_index.len(), 2);
    }

    #[test]
    fn docked_line_follows_anchor() {
        let registry = ShapeRegistry::new();
        let mut doc = TopologyData::new();
        let a = doc.add_pen(node("dock_a", 0.0));
        doc.add_pen(node("dock_b", 300.0));
        doc.init_all(&registry);

        let mut from = doc.graph[a].as_node().unwrap().rotated_anchors[2];
        from.owner = Some(PenId::intern("dock_a"));
        let b_anchor = doc.get_by_id(PenId::intern("dock_b")).unwrap().as_node().unwrap().rotated_anchors[0];
        let mut to = b_anchor;
        to.owner = Some(PenId::intern("dock_b"));
        let l = doc.add_pen(Pen::line(PenId::intern("dock_l"), Line::new(LineKind::Curve, from, to)));
        let before = doc.graph[l].as_line().unwrap().controls().to_vec();

        doc.graph[a].translate(50.0, 0.0);
        doc.init_pen(a, &registry);
        doc.update_docked_lines(&HashSet::from([PenId::intern("dock_a")]));

        let line = doc.graph[l].as_line().unwrap();
        let anchor = doc.graph[a].as_node().unwrap().rotated_anchors[2];
        assert_eq!((line.from().x, line.from().y), (anchor.x, anchor.y));
        assert_ne!(line.controls(), before.as_slice());
    }

    #[test]
    fn lock_levels_round_trip_as_numbers() {
        assert_eq!(serde_json::to_string(&Lock::NoEvent).unwrap(), "10");
        let l: Lock = serde_json::from_str("2").unwrap();
        assert_eq!(l, Lock::NoMove);
        assert!(serde_json::from_str::<Lock>("7").is_err());
    }
}
