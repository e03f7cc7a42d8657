//! Animation layer: schedules node keyframe timelines and line travel.
//!
//! The layer never owns a timer. When it has work it hands out a
//! [`FrameToken`]; the host calls [`AnimateLayer::tick`] with that token on
//! its next frame callback. Only the outstanding token is honoured, so
//! `stop()` (which forgets it) turns any late callback into a no-op.
//!
//! Ticks closer together than the frame interval are skipped but keep the
//! schedule alive. Chained animations (`nextAnimate`) and tag triggers go
//! through a queue resolved against the arena at the start of a tick.

use std::collections::{HashSet, VecDeque};
use topo_core::animation::sample;
use topo_core::{FrameState, Pen, PenId, PenIndex, ShapeRegistry, Surface, TopologyData};
use topo_render::{render_line_travel, render_pen};

use crate::events::{EventBus, TopologyEvent};

/// Permission to run one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameToken(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Every pen carrying the tag.
    Tag(String),
    Pen(PenId),
}

#[derive(Debug, Clone)]
struct NodeRun {
    idx: PenIndex,
    /// State before the timeline started; restored by `stop`.
    origin: FrameState,
    started: f64,
}

#[derive(Debug, Clone)]
struct LineRun {
    idx: PenIndex,
    /// Copy of the line carrying the travel position; the document line is
    /// never touched.
    ghost: Pen,
    length: f64,
    cycles_done: u32,
}

#[derive(Debug, Clone)]
pub struct AnimateLayer {
    nodes: Vec<NodeRun>,
    lines: Vec<LineRun>,
    triggers: VecDeque<Trigger>,
    token: Option<FrameToken>,
    issued: u64,
    last_tick: Option<f64>,
    interval: f64,
}

impl Default for AnimateLayer {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl AnimateLayer {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            nodes: Vec::new(),
            lines: Vec::new(),
            triggers: VecDeque::new(),
            token: None,
            issued: 0,
            last_tick: None,
            interval: interval_ms.max(0.0),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.nodes.is_empty() && self.lines.is_empty() && self.triggers.is_empty()
    }

    /// Whether `idx` is a node whose drawing this layer has taken over.
    pub fn owns(&self, idx: PenIndex) -> bool {
        self.nodes.iter().any(|r| r.idx == idx)
    }

    pub fn running(&self) -> Vec<PenIndex> {
        self.nodes
            .iter()
            .map(|r| r.idx)
            .chain(self.lines.iter().map(|r| r.idx))
            .collect()
    }

    // ─── Scheduling ──────────────────────────────────────────────────────

    /// Queue a start, resolved on the next tick.
    pub fn trigger(&mut self, trigger: Trigger) {
        self.triggers.push_back(trigger);
    }

    /// The token the next tick must carry, if one was handed out.
    pub fn outstanding(&self) -> Option<FrameToken> {
        self.token
    }

    /// A token for the next frame, if there is work and none is already
    /// outstanding.
    pub fn request_frame(&mut self) -> Option<FrameToken> {
        if self.is_idle() || self.token.is_some() {
            return None;
        }
        self.issued += 1;
        let token = FrameToken(self.issued);
        self.token = Some(token);
        Some(token)
    }

    /// Start the animation of one pen now. Pens without keyframes (nodes)
    /// or already running are left alone.
    pub fn start(&mut self, doc: &mut TopologyData, idx: PenIndex, now: f64, events: &mut EventBus) -> bool {
        if self.running().contains(&idx) {
            return false;
        }
        let Some(pen) = doc.get_mut(idx) else {
            return false;
        };
        // Zero marks "not playing", so a host clock starting at zero is nudged.
        let started = if now > 0.0 { now } else { f64::MIN_POSITIVE };
        if let Some(node) = pen.as_node() {
            if node.animate_frames.is_empty() {
                log::debug!("#{} has no keyframes", pen.id);
                return false;
            }
            self.nodes.push(NodeRun {
                idx,
                origin: FrameState::capture(pen),
                started,
            });
        } else {
            let mut ghost = pen.clone();
            let length = ghost.as_line_mut().map_or(0.0, |l| l.length());
            if let Some(l) = ghost.as_line_mut() {
                l.animate_pos = 0.0;
            }
            self.lines.push(LineRun {
                idx,
                ghost,
                length,
                cycles_done: 0,
            });
        }
        pen.base.timing.animate_start = started;
        pen.base.timing.animate_cycle_index = 0;
        events.emit(TopologyEvent::AnimateStart(pen.id));
        true
    }

    /// Advance every running animation. Returns the token for the next
    /// frame, or `None` when the token is stale or nothing is left to do.
    pub fn tick(
        &mut self,
        token: FrameToken,
        now: f64,
        doc: &mut TopologyData,
        registry: &ShapeRegistry,
        events: &mut EventBus,
    ) -> Option<FrameToken> {
        if self.token != Some(token) {
            log::trace!("stale frame token {token:?}");
            return None;
        }
        self.token = None;
        if let Some(last) = self.last_tick
            && now - last < self.interval
        {
            return self.request_frame();
        }
        self.last_tick = Some(now);

        self.resolve_triggers(doc, now, events);
        self.advance_nodes(doc, registry, now, events);
        self.advance_lines(doc, events);
        self.request_frame()
    }

    fn resolve_triggers(&mut self, doc: &mut TopologyData, now: f64, events: &mut EventBus) {
        while let Some(trigger) = self.triggers.pop_front() {
            let targets = match &trigger {
                Trigger::Tag(tag) => doc.find_by_tag(tag),
                Trigger::Pen(id) => doc.index_of(*id).into_iter().collect(),
            };
            if targets.is_empty() {
                log::debug!("trigger {trigger:?} matched nothing");
            }
            for idx in targets {
                self.start(doc, idx, now, events);
            }
        }
    }

    fn advance_nodes(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry, now: f64, events: &mut EventBus) {
        let mut finished = Vec::new();
        for run in &self.nodes {
            let Some(pen) = doc.get_mut(run.idx) else {
                finished.push(run.idx);
                continue;
            };
            let cycles = pen.base.timing.animate_cycle;
            let Some(node) = pen.as_node() else {
                finished.push(run.idx);
                continue;
            };
            let s = sample(&node.animate_frames, &run.origin, now - run.started, cycles);
            s.state.apply(pen);
            pen.base.timing.animate_cycle_index = s.cycles_done;
            if s.finished {
                pen.base.timing.animate_start = 0.0;
                let id = pen.id;
                let next = pen.base.timing.next_animate.clone();
                events.emit(TopologyEvent::AnimateEnd(id));
                if let Some(tag) = next.filter(|t| !t.is_empty()) {
                    self.triggers.push_back(Trigger::Tag(tag));
                }
                finished.push(run.idx);
            }
            refresh(doc, registry, run.idx);
        }
        self.nodes.retain(|r| !finished.contains(&r.idx));
    }

    fn advance_lines(&mut self, doc: &mut TopologyData, events: &mut EventBus) {
        let mut finished = Vec::new();
        for run in &mut self.lines {
            let Some(pen) = doc.get_mut(run.idx).filter(|p| p.is_line()) else {
                finished.push(run.idx);
                continue;
            };
            // Follow the live line in case it moved since the last frame.
            let pos = run.ghost.as_line().map_or(0.0, |l| l.animate_pos);
            run.ghost = pen.clone();
            let Some(line) = run.ghost.as_line_mut() else {
                continue;
            };
            run.length = line.length();
            line.animate_pos = pos + line.animate_span;
            if line.animate_pos < run.length {
                continue;
            }
            line.animate_pos = 0.0;
            run.cycles_done += 1;
            pen.base.timing.animate_cycle_index = run.cycles_done;
            let cycles = pen.base.timing.animate_cycle;
            if cycles > 0 && run.cycles_done >= cycles as u32 {
                pen.base.timing.animate_start = 0.0;
                events.emit(TopologyEvent::AnimateEnd(pen.id));
                if let Some(tag) = pen.base.timing.next_animate.clone().filter(|t| !t.is_empty()) {
                    self.triggers.push_back(Trigger::Tag(tag));
                }
                finished.push(run.idx);
            }
        }
        self.lines.retain(|r| !finished.contains(&r.idx));
    }

    // ─── Stopping ────────────────────────────────────────────────────────

    /// Stop everything: nodes go back to their pre-animation state and the
    /// outstanding token is forgotten.
    pub fn stop(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry) {
        for idx in self.running() {
            self.stop_pen(doc, registry, idx);
        }
        self.triggers.clear();
        self.token = None;
        self.last_tick = None;
    }

    pub fn stop_pen(&mut self, doc: &mut TopologyData, registry: &ShapeRegistry, idx: PenIndex) -> bool {
        let node_run = self.nodes.iter().position(|r| r.idx == idx).map(|i| self.nodes.remove(i));
        let line_run = self.lines.iter().position(|r| r.idx == idx).map(|i| self.lines.remove(i));
        if node_run.is_none() && line_run.is_none() {
            return false;
        }
        if let Some(pen) = doc.get_mut(idx) {
            if let Some(run) = &node_run {
                run.origin.apply(pen);
            }
            pen.base.timing.animate_start = 0.0;
            pen.base.timing.animate_cycle_index = 0;
        }
        if node_run.is_some() {
            refresh(doc, registry, idx);
        }
        if self.is_idle() {
            self.token = None;
        }
        true
    }

    /// Forget all runs without touching the document (it is being replaced).
    pub fn reset(&mut self) {
        *self = Self::new(self.interval);
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Draw animated top-level nodes and line ghosts. Animated children are
    /// drawn by their parent's pass.
    pub fn render(&self, surface: &mut dyn Surface, doc: &TopologyData, registry: &ShapeRegistry) {
        for run in &self.nodes {
            if doc.parent(run.idx).is_none() {
                render_pen(surface, doc, run.idx, registry);
            }
        }
        for run in &self.lines {
            if let Some(line) = run.ghost.as_line() {
                render_line_travel(surface, &run.ghost, line, run.length);
            }
        }
    }
}

/// Re-init a node after its state changed and drag docked lines along.
fn refresh(doc: &mut TopologyData, registry: &ShapeRegistry, idx: PenIndex) {
    doc.init_pen(idx, registry);
    let ids: HashSet<PenId> = doc
        .descendants(idx)
        .into_iter()
        .filter_map(|i| doc.get(i).map(|p| p.id))
        .collect();
    doc.update_docked_lines(&ids);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topo_core::{Keyframe, Line, LineKind, Node, Point, Rect};

    fn keyframe(x: f64) -> Keyframe {
        Keyframe {
            duration: 500.0,
            linear: true,
            state: FrameState {
                rect: Rect::new(x, 0.0, 100.0, 100.0),
                ..FrameState::default()
            },
        }
    }

    fn animated_doc(id: &str) -> (TopologyData, PenIndex) {
        let mut doc = TopologyData::new();
        let mut node = Node::new("rectangle", Rect::new(0.0, 0.0, 100.0, 100.0));
        node.animate_frames = vec![keyframe(200.0), keyframe(200.0)];
        let mut pen = Pen::node(PenId::intern(id), node);
        pen.base.timing.animate_cycle = 1;
        pen.base.timing.next_animate = Some("after".into());
        let idx = doc.add_pen(pen);
        doc.init_all(&ShapeRegistry::new());
        (doc, idx)
    }

    #[test]
    fn keyframes_play_settle_and_chain() {
        let registry = ShapeRegistry::new();
        let (mut doc, a) = animated_doc("anim_a");
        let mut events = EventBus::default();
        let mut layer = AnimateLayer::new(30.0);

        assert!(layer.start(&mut doc, a, 1000.0, &mut events));
        assert!(doc.get(a).unwrap().is_animating());
        let token = layer.request_frame().unwrap();
        let token = layer.tick(token, 1250.0, &mut doc, &registry, &mut events).unwrap();
        assert_eq!(doc.get(a).unwrap().rect(), Rect::new(100.0, 0.0, 100.0, 100.0));

        let next = layer.tick(token, 2000.0, &mut doc, &registry, &mut events);
        assert_eq!(doc.get(a).unwrap().rect(), Rect::new(200.0, 0.0, 100.0, 100.0));
        assert!(!doc.get(a).unwrap().is_animating());
        let names: Vec<&str> = events.drain().iter().map(TopologyEvent::name).collect();
        assert_eq!(names, vec!["animateStart", "animateEnd"]);
        // The queued `nextAnimate` trigger keeps the schedule alive.
        assert!(next.is_some());
    }

    #[test]
    fn stale_token_is_ignored_after_stop() {
        let registry = ShapeRegistry::new();
        let (mut doc, a) = animated_doc("anim_b");
        let mut events = EventBus::default();
        let mut layer = AnimateLayer::new(30.0);
        layer.start(&mut doc, a, 1000.0, &mut events);
        let token = layer.request_frame().unwrap();
        layer.tick(token, 1250.0, &mut doc, &registry, &mut events);

        layer.stop(&mut doc, &registry);
        assert_eq!(doc.get(a).unwrap().rect(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(layer.tick(token, 1500.0, &mut doc, &registry, &mut events).is_none());
        assert_eq!(doc.get(a).unwrap().rect(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(layer.request_frame().is_none());
    }

    #[test]
    fn ticks_inside_the_interval_only_reschedule() {
        let registry = ShapeRegistry::new();
        let (mut doc, a) = animated_doc("anim_c");
        let mut events = EventBus::default();
        let mut layer = AnimateLayer::new(30.0);
        layer.start(&mut doc, a, 1000.0, &mut events);
        let t = layer.request_frame().unwrap();
        let t = layer.tick(t, 1100.0, &mut doc, &registry, &mut events).unwrap();
        let before = doc.get(a).unwrap().rect();
        let t = layer.tick(t, 1110.0, &mut doc, &registry, &mut events);
        assert!(t.is_some());
        assert_eq!(doc.get(a).unwrap().rect(), before);
    }

    #[test]
    fn line_travel_counts_cycles() {
        let registry = ShapeRegistry::new();
        let mut doc = TopologyData::new();
        let mut line = Line::new(LineKind::Straight, Point::new(0.0, 0.0), Point::new(2.5, 0.0));
        line.animate_span = 1.0;
        let mut pen = Pen::line(PenId::intern("anim_line"), line);
        pen.base.timing.animate_cycle = 1;
        let l = doc.add_pen(pen);
        let mut events = EventBus::default();
        let mut layer = AnimateLayer::new(0.0);
        assert!(layer.start(&mut doc, l, 1.0, &mut events));

        let mut token = layer.request_frame();
        let mut now = 1.0;
        while let Some(t) = token {
            now += 30.0;
            token = layer.tick(t, now, &mut doc, &registry, &mut events);
        }
        // Three steps of one pixel cover a 2.5px path.
        assert_eq!(now, 91.0);
        assert!(!doc.get(l).unwrap().is_animating());
        assert!(layer.is_idle());
    }
}
