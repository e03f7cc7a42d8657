//! The interaction controller.
//!
//! `Topology` owns the document, the shape registry, the three overlay
//! layers, history, clipboard and the event bus. Hosts feed it pointer and
//! keyboard input and call [`Topology::frame`] / [`Topology::paint`] from
//! their frame callback.
//!
//! A pointer-down picks exactly one gesture by precedence and keeps it
//! until pointer-up: rotate handle, resize handle, the selected line's
//! control points, any line end or body, a node anchor or body (children
//! before parents), then empty space. Pointer moves are coalesced and only
//! applied in `frame`; pointer-up flushes the last one before committing.
//!
//! Every mutating call returns `false` (or `None`) instead of failing
//! loudly: on a locked document, for an unknown shape, or when there is
//! nothing to act on.

use std::collections::HashSet;
use topo_core::{
    Line, LineEnd, LineKind, Lock, Pen, PenFile, PenId, PenIndex, Point, Rect, ShapeRegistry, Surface,
    TopologyData,
};
use topo_core::pen::{EventAction, EventTrigger};
use topo_render::{
    LineHit, hit_line, hit_line_control, hit_node, hit_node_anchor, pens_in_rect, register_builtin_shapes,
};

use crate::active::{ActiveLayer, Align};
use crate::animate::{AnimateLayer, FrameToken, Trigger};
use crate::clipboard::{Clipboard, insert_files};
use crate::compositor::{Compositor, Layers};
use crate::docking::DockHandler;
use crate::events::{EventBus, TopologyEvent};
use crate::history::History;
use crate::hover::HoverLayer;
use crate::input::{InputEvent, Modifiers, MoveCoalescer};
use crate::options::Options;
use crate::shortcuts::{ShortcutAction, ShortcutMap};

/// The gesture chosen at pointer-down.
#[derive(Debug, Clone)]
enum Gesture {
    None,
    /// Selection-only press (locked document or pen): fires click bindings.
    Click { target: PenIndex },
    Marquee { start: Point },
    Move { start: Point, target: PenIndex, moved: bool },
    Resize { handle: usize, start: Point, moved: bool },
    Rotate { start: Point, moved: bool },
    LineEnd { line: PenIndex, end: LineEnd, start: Point, saved: Box<Pen>, moved: bool },
    LineControl { line: PenIndex, index: usize, start: Point, saved: Box<Pen>, moved: bool },
    DrawLine,
}

#[derive(Debug)]
pub struct Topology {
    pub data: TopologyData,
    registry: ShapeRegistry,
    options: Options,
    active: ActiveLayer,
    hover: HoverLayer,
    animate: AnimateLayer,
    compositor: Compositor,
    history: History,
    clipboard: Clipboard,
    events: EventBus,
    coalescer: MoveCoalescer,
    dock: DockHandler,
    gesture: Gesture,
    anim_token: Option<FrameToken>,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Topology {
    /// A controller with the builtin shapes registered.
    pub fn new(options: Options) -> Self {
        let mut registry = ShapeRegistry::new();
        register_builtin_shapes(&mut registry);
        Self::with_registry(options, registry)
    }

    pub fn with_registry(options: Options, registry: ShapeRegistry) -> Self {
        let data = TopologyData::new();
        let mut history = History::new(options.history_capacity);
        match data.snapshot() {
            Ok(s) => history.reset(s),
            Err(e) => log::warn!("{e}"),
        }
        Self {
            data,
            registry,
            active: ActiveLayer::new(),
            hover: HoverLayer::new(),
            animate: AnimateLayer::new(options.frame_interval_ms),
            compositor: Compositor::new(Rect::default()),
            history,
            clipboard: Clipboard::new(),
            events: EventBus::default(),
            coalescer: MoveCoalescer::default(),
            dock: DockHandler::default(),
            gesture: Gesture::None,
            anim_token: None,
            options,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Register shapes here before opening documents that use them.
    pub fn registry_mut(&mut self) -> &mut ShapeRegistry {
        &mut self.registry
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn on_event(&mut self, hook: impl FnMut(&TopologyEvent) + 'static) {
        self.events.set_hook(hook);
    }

    pub fn selection(&self) -> &[PenIndex] {
        self.active.pens()
    }

    pub fn active(&self) -> &ActiveLayer {
        &self.active
    }

    pub fn hover(&self) -> &HoverLayer {
        &self.hover
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.compositor.set_viewport(viewport);
    }

    /// Whether the host should schedule a frame callback.
    pub fn needs_frame(&self) -> bool {
        self.coalescer.is_scheduled() || self.anim_token.is_some() || self.compositor.dirty().any()
    }

    fn can_edit(&self) -> bool {
        self.data.locked.editable()
    }

    // ─── Document ────────────────────────────────────────────────────────

    /// Replace the document. A parse failure leaves the current one intact.
    pub fn open(&mut self, json: &str) -> bool {
        let data = match TopologyData::from_json(json, &self.registry) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("open failed: {e}");
                return false;
            }
        };
        self.animate.reset();
        self.anim_token = None;
        self.data = data;
        self.reset_interaction();
        match self.data.snapshot() {
            Ok(s) => self.history.reset(s),
            Err(e) => log::warn!("{e}"),
        }
        let autoplay: Vec<PenId> = self
            .data
            .walk()
            .into_iter()
            .filter_map(|i| self.data.get(i))
            .filter(|p| p.base.timing.animate_play)
            .map(|p| p.id)
            .collect();
        for id in autoplay {
            self.animate.trigger(Trigger::Pen(id));
        }
        self.schedule_animation();
        self.compositor.mark_all();
        self.events.emit(TopologyEvent::Open);
        true
    }

    pub fn to_json(&self) -> Result<String, String> {
        self.data.to_json()
    }

    /// Empty the document.
    pub fn clear(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        self.animate.stop(&mut self.data, &self.registry);
        self.anim_token = None;
        self.data.clear();
        self.reset_interaction();
        self.commit();
        self.events.emit(TopologyEvent::Clear);
        true
    }

    fn reset_interaction(&mut self) {
        self.active.clear();
        self.hover.clear();
        self.dock.cleanup();
        self.coalescer.take();
        self.gesture = Gesture::None;
    }

    /// Record the live document as a history step and repaint.
    fn commit(&mut self) {
        match self.data.snapshot() {
            Ok(s) => self.history.push(s),
            Err(e) => log::warn!("{e}"),
        }
        self.compositor.mark_all();
    }

    fn restore_snapshot(&mut self, bytes: &[u8]) -> bool {
        match TopologyData::from_snapshot(bytes, &self.registry) {
            Ok(data) => {
                self.animate.reset();
                self.anim_token = None;
                self.data = data;
                self.reset_interaction();
                self.compositor.mark_all();
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        let Some(bytes) = self.history.undo().map(<[u8]>::to_vec) else {
            return false;
        };
        let ok = self.restore_snapshot(&bytes);
        if ok {
            self.events.emit(TopologyEvent::Undo);
        }
        ok
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        let Some(bytes) = self.history.redo().map(<[u8]>::to_vec) else {
            return false;
        };
        let ok = self.restore_snapshot(&bytes);
        if ok {
            self.events.emit(TopologyEvent::Redo);
        }
        ok
    }

    pub fn lock(&mut self, level: Lock) -> bool {
        self.data.locked = level;
        if !level.editable() {
            self.cancel_gesture();
        }
        self.compositor.mark_all();
        self.events.emit(TopologyEvent::Locked(level));
        true
    }

    // ─── Adding & removing ───────────────────────────────────────────────

    /// Add a node on top. Fails for lines and for unregistered shapes.
    pub fn add_node(&mut self, pen: Pen) -> Option<PenIndex> {
        if !self.can_edit() {
            return None;
        }
        let name = &pen.as_node()?.name;
        if !self.registry.has_shape(name) {
            log::warn!("cannot add node: shape {name:?} is not registered");
            return None;
        }
        let idx = self.data.add_pen(pen);
        self.data.init_pen(idx, &self.registry);
        let id = self.data.get(idx)?.id;
        self.commit();
        self.events.emit(TopologyEvent::AddNode(id));
        Some(idx)
    }

    /// Add a line on top; docked ends snap to their owners' anchors.
    pub fn add_line(&mut self, pen: Pen) -> Option<PenIndex> {
        if !self.can_edit() || !pen.is_line() {
            return None;
        }
        let owners: HashSet<PenId> = pen
            .as_line()
            .map(|l| [l.from().owner, l.to().owner].into_iter().flatten().collect())
            .unwrap_or_default();
        let idx = self.data.add_pen(pen);
        self.data.init_pen(idx, &self.registry);
        self.data.update_docked_lines(&owners);
        let id = self.data.get(idx)?.id;
        self.commit();
        self.events.emit(TopologyEvent::AddLine(id));
        Some(idx)
    }

    /// Delete the selection, along with its children.
    pub fn delete(&mut self) -> bool {
        if !self.can_edit() || self.active.is_empty() {
            return false;
        }
        let ids = self.active.ids(&self.data);
        self.remove_pens(self.active.pens().to_vec());
        self.active.clear();
        self.hover.clear();
        self.commit();
        self.events.emit(TopologyEvent::Delete(ids));
        true
    }

    fn remove_pens(&mut self, pens: Vec<PenIndex>) {
        let mut removed_ids = HashSet::new();
        for idx in pens {
            for i in self.data.descendants(idx) {
                self.animate.stop_pen(&mut self.data, &self.registry, i);
            }
            for pen in self.data.remove(idx) {
                if let Some(element) = pen.as_node().and_then(|n| n.element_id.clone()) {
                    self.events.emit(TopologyEvent::RemoveElement(element));
                }
                removed_ids.insert(pen.id);
            }
        }
        self.sync_animation();
        // Lines docked to removed nodes keep their coordinates, undocked.
        self.data.update_docked_lines(&removed_ids);
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    /// Serialize the selection. The JSON is also kept for `paste`.
    pub fn copy(&mut self) -> Option<String> {
        let pens = self.active.pens().to_vec();
        match self.clipboard.copy(&self.data, &pens) {
            Ok(json) => {
                self.events.emit(TopologyEvent::Copy(self.active.ids(&self.data)));
                Some(json)
            }
            Err(e) => {
                log::debug!("{e}");
                None
            }
        }
    }

    pub fn cut(&mut self) -> Option<String> {
        if !self.can_edit() {
            return None;
        }
        let ids = self.active.ids(&self.data);
        let json = self.clipboard.copy(&self.data, self.active.pens()).ok()?;
        self.remove_pens(self.active.pens().to_vec());
        self.active.clear();
        self.commit();
        self.events.emit(TopologyEvent::Cut(ids));
        Some(json)
    }

    pub fn paste(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        match self.clipboard.paste(&mut self.data, &self.registry, self.options.paste_offset) {
            Ok(pens) => {
                self.active.set(&self.data, pens);
                self.commit();
                self.events.emit(TopologyEvent::Paste(self.active.ids(&self.data)));
                true
            }
            Err(e) => {
                log::warn!("paste failed: {e}");
                false
            }
        }
    }

    /// Paste JSON coming from the host clipboard.
    pub fn paste_text(&mut self, json: &str) -> bool {
        self.clipboard.set(json);
        self.paste()
    }

    // ─── Grouping ────────────────────────────────────────────────────────

    /// Group the selected top-level nodes under a new `combine` node.
    pub fn combine(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        let members: Vec<PenIndex> = self
            .active
            .pens()
            .iter()
            .copied()
            .filter(|&i| self.data.parent(i).is_none() && self.data.get(i).is_some_and(Pen::is_node))
            .collect();
        if members.len() < 2 {
            return false;
        }
        let rect = Rect::bounding(
            members
                .iter()
                .filter_map(|&i| self.data.get(i))
                .flat_map(|p| p.world_points()),
        );
        let group = self.data.add_pen(Pen::node(PenId::fresh(), topo_core::Node::new("combine", rect)));
        self.data.init_pen(group, &self.registry);
        for &m in &members {
            self.data.detach(m);
            self.data.attach_child(group, m);
            self.data.calc_rect_in_parent(m);
        }
        self.data.init_pen(group, &self.registry);
        self.active.set(&self.data, vec![group]);
        let Some(id) = self.data.get(group).map(|p| p.id) else {
            return false;
        };
        self.commit();
        self.events.emit(TopologyEvent::Combine(id));
        true
    }

    /// Lift the children of the selected node to the top level. A
    /// `combine` container left empty is removed.
    pub fn uncombine(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        let Some(parent) = self.active.single() else {
            return false;
        };
        let children = self.data.children(parent).to_vec();
        if children.is_empty() {
            return false;
        }
        let Some(pen) = self.data.get(parent) else {
            return false;
        };
        let id = pen.id;
        let is_container = pen.as_node().is_some_and(|n| n.name == "combine");
        for &c in &children {
            self.data.detach(c);
            self.data.attach_top(c);
            if let Some(node) = self.data.get_mut(c).and_then(Pen::as_node_mut) {
                node.rect_in_parent = None;
            }
            self.data.init_pen(c, &self.registry);
        }
        if is_container {
            self.data.remove(parent);
        }
        self.active.set(&self.data, children);
        self.commit();
        self.events.emit(TopologyEvent::Uncombine(id));
        true
    }

    // ─── Arrangement ─────────────────────────────────────────────────────

    pub fn align_selection(&mut self, how: Align) -> bool {
        if !self.can_edit() || !self.active.movable(&self.data) {
            return false;
        }
        if !self.active.align(&mut self.data, &self.registry, how) {
            return false;
        }
        self.commit();
        self.events.emit(TopologyEvent::Move(self.active.ids(&self.data)));
        true
    }

    pub fn space_between(&mut self, horizontal: bool) -> bool {
        if !self.can_edit() || !self.active.movable(&self.data) {
            return false;
        }
        if !self.active.space_between(&mut self.data, &self.registry, horizontal) {
            return false;
        }
        self.commit();
        self.events.emit(TopologyEvent::Move(self.active.ids(&self.data)));
        true
    }

    /// Move the whole document. Docking is preserved.
    pub fn translate(&mut self, dx: f64, dy: f64) -> bool {
        if !self.can_edit() || (dx == 0.0 && dy == 0.0) {
            return false;
        }
        for idx in self.data.pens.clone() {
            if let Some(pen) = self.data.get_mut(idx) {
                match &mut pen.kind {
                    topo_core::PenKind::Node(n) => n.rect.translate(dx, dy),
                    topo_core::PenKind::Line(l) => l.translate(dx, dy),
                }
            }
        }
        self.data.init_all(&self.registry);
        self.active.update_rect(&self.data);
        self.commit();
        self.events.emit(TopologyEvent::Translate { dx, dy });
        true
    }

    /// Scale the whole document by `factor` about `center`.
    pub fn scale(&mut self, factor: f64, center: Point) -> bool {
        if !self.can_edit() || factor <= 0.0 || !factor.is_finite() {
            return false;
        }
        for idx in self.data.pens.clone() {
            if let Some(pen) = self.data.get_mut(idx) {
                pen.scale(factor, center);
            }
        }
        self.data.scale *= factor;
        self.data.init_all(&self.registry);
        let nodes: HashSet<PenId> = self
            .data
            .walk()
            .into_iter()
            .filter_map(|i| self.data.get(i))
            .filter(|p| p.is_node())
            .map(|p| p.id)
            .collect();
        self.data.update_docked_lines(&nodes);
        self.active.update_rect(&self.data);
        self.commit();
        self.events.emit(TopologyEvent::Scale(self.data.scale));
        true
    }

    /// Scale so the document scale becomes `target`.
    pub fn scale_to(&mut self, target: f64, center: Point) -> bool {
        if self.data.scale <= 0.0 {
            return false;
        }
        self.scale(target / self.data.scale, center)
    }

    fn reorder(&mut self, f: fn(&mut TopologyData, PenIndex) -> bool) -> bool {
        if !self.can_edit() {
            return false;
        }
        let mut changed = false;
        for idx in self.active.pens().to_vec() {
            changed |= f(&mut self.data, idx);
        }
        if changed {
            self.commit();
        }
        changed
    }

    pub fn top(&mut self) -> bool {
        self.reorder(TopologyData::bring_to_front)
    }

    pub fn bottom(&mut self) -> bool {
        self.reorder(TopologyData::send_to_back)
    }

    pub fn up(&mut self) -> bool {
        self.reorder(TopologyData::bring_forward)
    }

    pub fn down(&mut self) -> bool {
        self.reorder(TopologyData::send_backward)
    }

    /// Use `kind` for lines drawn from now on and re-kind the selected ones.
    pub fn set_line_kind(&mut self, kind: LineKind) -> bool {
        if !self.can_edit() {
            return false;
        }
        self.data.line_kind = kind;
        let mut changed = false;
        for idx in self.active.pens().to_vec() {
            if let Some(line) = self.data.get_mut(idx).and_then(Pen::as_line_mut) {
                line.kind = kind;
                line.manual_cps = false;
                line.calc_control_points();
                changed = true;
            }
            self.data.init_pen(idx, &self.registry);
        }
        if changed {
            self.active.update_rect(&self.data);
        }
        self.commit();
        true
    }

    // ─── Selection & lookup ──────────────────────────────────────────────

    pub fn select_all(&mut self) {
        self.active.set(&self.data, self.data.pens.clone());
        self.compositor.mark_active();
        self.emit_selection();
    }

    pub fn select(&mut self, ids: &[PenId]) {
        let pens = ids.iter().filter_map(|&id| self.data.index_of(id)).collect();
        self.active.set(&self.data, pens);
        self.compositor.mark_active();
        self.emit_selection();
    }

    pub fn find(&self, id: &str) -> Option<&Pen> {
        self.data.get_by_id(PenId::intern(id))
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<&Pen> {
        self.data
            .find_by_tag(tag)
            .into_iter()
            .filter_map(|i| self.data.get(i))
            .collect()
    }

    /// Bounding box of every top-level pen.
    pub fn get_rect(&self) -> Rect {
        self.data.bounds()
    }

    fn emit_selection(&mut self) {
        let event = match self.active.pens() {
            [] => return,
            [one] => match self.data.get(*one) {
                Some(p) if p.is_line() => TopologyEvent::Line(p.id),
                Some(p) => TopologyEvent::Node(p.id),
                None => return,
            },
            _ => TopologyEvent::Multi(self.active.ids(&self.data)),
        };
        self.events.emit(event);
    }

    // ─── Animation ───────────────────────────────────────────────────────

    /// Start the pen with this id, or every pen carrying this tag.
    pub fn start_animate(&mut self, target: &str) -> bool {
        let trigger = match self.data.index_of(PenId::intern(target)) {
            Some(_) => Trigger::Pen(PenId::intern(target)),
            None if !self.data.find_by_tag(target).is_empty() => Trigger::Tag(target.to_string()),
            None => return false,
        };
        self.animate.trigger(trigger);
        self.schedule_animation();
        true
    }

    /// Stop one pen's animation, or all of them.
    pub fn stop_animate(&mut self, id: Option<PenId>) -> bool {
        let stopped = match id {
            Some(id) => match self.data.index_of(id) {
                Some(idx) => {
                    let stopped = self.animate.stop_pen(&mut self.data, &self.registry, idx);
                    self.sync_animation();
                    stopped
                }
                None => false,
            },
            None => {
                self.animate.stop(&mut self.data, &self.registry);
                self.anim_token = None;
                true
            }
        };
        self.compositor.mark_all();
        stopped
    }

    /// Make sure a frame is requested while the layer has work. A token the
    /// layer no longer honours (it went idle in between) is replaced.
    fn schedule_animation(&mut self) {
        if self.anim_token.is_none() || self.anim_token != self.animate.outstanding() {
            self.anim_token = self.animate.outstanding().or_else(|| self.animate.request_frame());
        }
    }

    /// Drop our copy of the frame token once the layer has forgotten it.
    fn sync_animation(&mut self) {
        if self.animate.outstanding().is_none() {
            self.anim_token = None;
        }
    }

    fn fire_bindings(&mut self, idx: PenIndex, trigger: EventTrigger) {
        let Some(pen) = self.data.get(idx) else {
            return;
        };
        let id = pen.id;
        let bindings: Vec<_> = pen.base.events.iter().filter(|e| e.trigger == trigger).cloned().collect();
        for binding in bindings {
            match binding.action {
                EventAction::Link => self.events.emit(TopologyEvent::Link { pen: id, url: binding.value }),
                EventAction::Function => self.events.emit(TopologyEvent::Function {
                    pen: id,
                    name: binding.value,
                }),
                EventAction::Animate => {
                    self.animate.trigger(Trigger::Tag(binding.value));
                    self.schedule_animation();
                }
            }
        }
    }

    // ─── Frame loop ──────────────────────────────────────────────────────

    /// Run one frame: apply the latest coalesced pointer move and advance
    /// animations. Returns whether another frame is wanted.
    pub fn frame(&mut self, now: f64) -> bool {
        if let Some((pt, modifiers)) = self.coalescer.take() {
            self.apply_move(pt, modifiers);
        }
        if let Some(token) = self.anim_token.take() {
            self.anim_token = self
                .animate
                .tick(token, now, &mut self.data, &self.registry, &mut self.events);
            self.compositor.mark_animate();
            self.compositor.mark_content();
        }
        self.needs_frame()
    }

    /// Compose the visible frame if anything changed.
    pub fn paint(&mut self, surface: &mut dyn Surface) -> bool {
        self.compositor.paint(
            surface,
            &self.data,
            &self.registry,
            Layers {
                animate: &self.animate,
                active: &self.active,
                hover: &self.hover,
            },
            &self.options,
        )
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Dispatch a normalized host event. Returns whether anything changed
    /// (for moves: whether a frame must be requested).
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerDown { x, y, modifiers } => self.pointer_down(Point::new(*x, *y), *modifiers),
            InputEvent::PointerMove { x, y, modifiers } => self.pointer_move(Point::new(*x, *y), *modifiers),
            InputEvent::PointerUp { x, y, modifiers } => self.pointer_up(Point::new(*x, *y), *modifiers),
            InputEvent::DoubleClick { x, y } => self.double_click(Point::new(*x, *y)),
            InputEvent::Wheel { dx, dy, zoom } => self.wheel(*dx, *dy, *zoom, self.compositor.viewport().center()),
            InputEvent::Key { key, modifiers } => self.key_down(key, *modifiers),
            InputEvent::Drop { x, y, data } => self.drop_pen(data, Point::new(*x, *y)),
            InputEvent::Blur => self.blur(),
        }
    }

    /// Zoom about `at` when `zoom` is not 1, otherwise pan by the scroll delta.
    pub fn wheel(&mut self, dx: f64, dy: f64, zoom: f64, at: Point) -> bool {
        if self.data.locked == Lock::NoEvent || !matches!(self.gesture, Gesture::None) {
            return false;
        }
        if zoom != 1.0 {
            self.scale(zoom, at)
        } else {
            self.translate(-dx, -dy)
        }
    }

    /// Add a pen dropped from a host palette, centered on `at`.
    pub fn drop_pen(&mut self, json: &str, at: Point) -> bool {
        if !self.can_edit() {
            return false;
        }
        let file: PenFile = match serde_json::from_str(json) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("invalid drop data: {e}");
                return false;
            }
        };
        let center = match &file {
            PenFile::Node(n) => {
                if !self.registry.has_shape(&n.node.name) {
                    log::warn!("cannot drop node: shape {:?} is not registered", n.node.name);
                    return false;
                }
                n.node.rect.center()
            }
            PenFile::Line(l) => Rect::bounding([*l.line.from(), *l.line.to()]).center(),
        };
        let inserted = insert_files(
            &mut self.data,
            &self.registry,
            vec![file],
            at.x - center.x,
            at.y - center.y,
        );
        let Some(pen) = inserted.first().and_then(|&i| self.data.get(i)) else {
            return false;
        };
        let event = if pen.is_line() {
            TopologyEvent::AddLine(pen.id)
        } else {
            TopologyEvent::AddNode(pen.id)
        };
        self.active.set(&self.data, inserted);
        self.commit();
        self.events.emit(event);
        true
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Classify a press into one gesture. Returns whether anything changed.
    pub fn pointer_down(&mut self, pt: Point, modifiers: Modifiers) -> bool {
        if self.data.locked == Lock::NoEvent {
            return false;
        }
        self.coalescer.take();
        let editable = self.can_edit();
        let opts = &self.options;

        if editable && self.active.movable(&self.data) {
            if self.active.hit_rotate_handle(&self.data, pt, opts) {
                log::debug!("gesture: rotate");
                self.active.save(&self.data);
                self.gesture = Gesture::Rotate { start: pt, moved: false };
                return true;
            }
            if let Some(handle) = self.active.hit_resize_handle(&self.data, pt, opts) {
                log::debug!("gesture: resize {handle}");
                self.active.save(&self.data);
                self.gesture = Gesture::Resize {
                    handle,
                    start: pt,
                    moved: false,
                };
                return true;
            }
            if let Some(line) = self.active.single().filter(|&i| self.data.get(i).is_some_and(Pen::is_line))
                && let Some(index) = hit_line_control(&self.data, line, pt, opts.anchor_radius)
                && let Some(saved) = self.data.get(line).cloned()
            {
                log::debug!("gesture: line control {index}");
                self.gesture = Gesture::LineControl {
                    line,
                    index,
                    start: pt,
                    saved: Box::new(saved),
                    moved: false,
                };
                return true;
            }
        }

        // Each hit test reports its topmost candidate; the one highest in
        // paint order wins. A node's anchors sit above its own body.
        let order = self.data.walk();
        let rank = |i: PenIndex| order.iter().position(|&p| p == i);
        let body = hit_node(&self.data, pt, 0.0);
        let anchor = hit_node_anchor(&self.data, pt, opts.anchor_radius)
            .filter(|&(node, _)| editable && body.is_none_or(|b| rank(node) >= rank(b)));
        let line_hit = hit_line(&self.data, pt, opts.handle_padding).filter(|&(line, _)| {
            [anchor.map(|(node, _)| node), body]
                .into_iter()
                .flatten()
                .all(|node| rank(line) > rank(node))
        });

        if let Some((line, hit)) = line_hit {
            let locked = self.data.get(line).is_some_and(|p| p.base.locked);
            match hit {
                LineHit::End(end) if editable && !locked => {
                    log::debug!("gesture: line end {end:?}");
                    self.active.set(&self.data, vec![line]);
                    if let Some(saved) = self.data.get(line).cloned() {
                        self.gesture = Gesture::LineEnd {
                            line,
                            end,
                            start: pt,
                            saved: Box::new(saved),
                            moved: false,
                        };
                    }
                }
                _ => self.press_pen(line, pt, modifiers),
            }
            self.emit_selection();
            self.compositor.mark_active();
            return true;
        }

        if let Some((node, index)) = anchor
            && let Some(from) = self.dock_point(node, index)
        {
            log::debug!("gesture: draw line");
            let kind = self.options.line_kind.unwrap_or(self.data.line_kind);
            let mut line = Line::new(kind, from, Point::new(pt.x, pt.y));
            line.from_arrow = self.options.from_arrow.clone().or_else(|| self.data.from_arrow.clone());
            line.to_arrow = self.options.to_arrow.clone().or_else(|| self.data.to_arrow.clone());
            self.hover.drawing = Some(Pen::line(PenId::fresh(), line));
            self.gesture = Gesture::DrawLine;
            self.compositor.mark_hover();
            return true;
        }

        if let Some(node) = body {
            self.press_pen(node, pt, modifiers);
            self.emit_selection();
            self.compositor.mark_active();
            return true;
        }

        log::debug!("gesture: marquee");
        if !modifiers.shift {
            let had_selection = !self.active.is_empty();
            self.active.clear();
            if had_selection {
                self.events.emit(TopologyEvent::Space);
            }
        }
        self.gesture = Gesture::Marquee { start: pt };
        self.compositor.mark_active();
        true
    }

    /// Select a pressed pen and start moving (or just clicking) it.
    fn press_pen(&mut self, idx: PenIndex, pt: Point, modifiers: Modifiers) {
        if modifiers.shift {
            self.active.toggle(&self.data, idx);
        } else if !self.active.contains(idx) {
            self.active.set(&self.data, vec![idx]);
        }
        if self.can_edit() && self.active.contains(idx) && self.active.movable(&self.data) {
            log::debug!("gesture: move");
            self.active.save(&self.data);
            self.dock.start(&self.data, self.active.pens());
            self.gesture = Gesture::Move {
                start: pt,
                target: idx,
                moved: false,
            };
        } else {
            self.gesture = Gesture::Click { target: idx };
        }
    }

    /// Record a pointer move. Returns whether the host must request a frame.
    pub fn pointer_move(&mut self, pt: Point, modifiers: Modifiers) -> bool {
        if self.data.locked == Lock::NoEvent {
            return false;
        }
        self.coalescer.record(pt, modifiers)
    }

    fn apply_move(&mut self, pt: Point, modifiers: Modifiers) {
        let threshold = self.options.dock_threshold;
        match &mut self.gesture {
            Gesture::None | Gesture::Click { .. } => self.update_hover(pt),
            Gesture::Marquee { start } => {
                self.hover.marquee = Some(Rect::from_corners(*start, pt));
                self.compositor.mark_hover();
            }
            Gesture::Move { start, moved, .. } => {
                let (dx, dy) = (pt.x - start.x, pt.y - start.y);
                *moved |= dx != 0.0 || dy != 0.0;
                // Alt drags freely.
                let (dx, dy, guides) = if modifiers.alt {
                    (dx, dy, Default::default())
                } else {
                    self.dock.snap(&self.active.saved_rect(), dx, dy, threshold)
                };
                self.active.translate(&mut self.data, &self.registry, dx, dy);
                self.hover.guides = guides;
                self.compositor.mark_all();
            }
            // Handle and endpoint drags follow the pointer's offset from the
            // press, and nothing changes until the pointer leaves that spot.
            Gesture::Resize { handle, start, moved } => {
                *moved |= !same_spot(pt, *start);
                if !*moved {
                    return;
                }
                let (handle, dx, dy) = (*handle, pt.x - start.x, pt.y - start.y);
                self.active
                    .resize(&mut self.data, &self.registry, handle, dx, dy, self.options.min_size);
                self.compositor.mark_all();
            }
            Gesture::Rotate { start, moved } => {
                *moved |= !same_spot(pt, *start);
                if !*moved {
                    return;
                }
                let start = *start;
                self.active.rotate(&mut self.data, &self.registry, start, pt);
                self.compositor.mark_all();
            }
            Gesture::LineEnd {
                line,
                end,
                start,
                saved,
                moved,
            } => {
                *moved |= !same_spot(pt, *start);
                let Some(from) = saved.as_line().map(|l| *l.end(*end)).filter(|_| *moved) else {
                    return;
                };
                let target = Point::new(from.x + pt.x - start.x, from.y + pt.y - start.y);
                let (line, end) = (*line, *end);
                self.drag_line_end(line, end, target);
            }
            Gesture::LineControl {
                line,
                index,
                start,
                saved,
                moved,
            } => {
                *moved |= !same_spot(pt, *start);
                let Some(from) = saved.as_line().and_then(|l| l.controls().get(*index).copied()).filter(|_| *moved)
                else {
                    return;
                };
                let (dx, dy) = (pt.x - start.x, pt.y - start.y);
                let (line, index) = (*line, *index);
                if let Some(l) = self.data.get_mut(line).and_then(Pen::as_line_mut)
                    && let Some(cp) = l.controls_mut().get_mut(index)
                {
                    cp.x = from.x + dx;
                    cp.y = from.y + dy;
                    l.manual_cps = true;
                }
                self.compositor.mark_all();
            }
            Gesture::DrawLine => {
                let skip = self
                    .hover
                    .drawing
                    .as_ref()
                    .and_then(Pen::as_line)
                    .and_then(|l| l.from().owner);
                let target = self.anchor_target(pt, skip);
                self.hover.anchor = target.map(|(n, i, _)| (n, i));
                let to = target.map_or(Point::new(pt.x, pt.y), |(_, _, p)| p);
                if let Some(line) = self.hover.drawing.as_mut().and_then(Pen::as_line_mut) {
                    *line.to_mut() = to;
                    line.calc_control_points();
                }
                self.compositor.mark_hover();
            }
        }
    }

    fn update_hover(&mut self, pt: Point) {
        let anchor = hit_node_anchor(&self.data, pt, self.options.anchor_radius);
        let node = hit_node(&self.data, pt, 0.0).or(anchor.map(|a| a.0));
        let line_control = self
            .active
            .single()
            .and_then(|l| hit_line_control(&self.data, l, pt, self.options.anchor_radius).map(|i| (l, i)));
        if (node, anchor, line_control) != (self.hover.node, self.hover.anchor, self.hover.line_control) {
            self.hover.node = node;
            self.hover.anchor = anchor;
            self.hover.line_control = line_control;
            self.compositor.mark_hover();
        }
    }

    /// World position of a node anchor, docked to its owner.
    fn dock_point(&self, node: PenIndex, index: usize) -> Option<Point> {
        let pen = self.data.get(node)?;
        let mut p = *pen.as_node()?.rotated_anchors.get(index)?;
        p.owner = Some(pen.id);
        p.anchor_index = Some(index);
        p.hidden = false;
        Some(p)
    }

    /// Anchor under `pt`, ignoring the node `skip`.
    fn anchor_target(&self, pt: Point, skip: Option<PenId>) -> Option<(PenIndex, usize, Point)> {
        let (node, index) = hit_node_anchor(&self.data, pt, self.options.anchor_radius)?;
        let p = self.dock_point(node, index)?;
        (p.owner != skip).then_some((node, index, p))
    }

    fn drag_line_end(&mut self, line: PenIndex, end: LineEnd, pt: Point) {
        let other = match end {
            LineEnd::From => LineEnd::To,
            LineEnd::To => LineEnd::From,
        };
        let skip = self
            .data
            .get(line)
            .and_then(Pen::as_line)
            .and_then(|l| l.end(other).owner);
        let target = self.anchor_target(pt, skip);
        self.hover.anchor = target.map(|(n, i, _)| (n, i));
        let p = target.map_or(Point::new(pt.x, pt.y), |(_, _, p)| p);
        if let Some(pen) = self.data.get_mut(line) {
            if let Some(l) = pen.as_line_mut() {
                *l.end_mut(end) = p;
                if !l.manual_cps {
                    l.calc_control_points();
                }
            }
            pen.init(&self.registry);
        }
        self.active.update_rect(&self.data);
        self.compositor.mark_all();
    }

    /// Finish the gesture. Returns whether anything changed.
    pub fn pointer_up(&mut self, pt: Point, modifiers: Modifiers) -> bool {
        if self.data.locked == Lock::NoEvent {
            return false;
        }
        self.coalescer.take();
        self.apply_move(pt, modifiers);
        let gesture = std::mem::replace(&mut self.gesture, Gesture::None);
        self.dock.cleanup();
        let drawing = self.hover.drawing.take();
        self.hover.clear_transient();
        self.hover.anchor = None;
        self.compositor.mark_hover();

        match gesture {
            Gesture::None => false,
            Gesture::Click { target } | Gesture::Move { target, moved: false, .. } => {
                self.fire_bindings(target, EventTrigger::Click);
                true
            }
            Gesture::Marquee { start } => {
                let rect = Rect::from_corners(start, pt);
                if rect.width > 0.0 && rect.height > 0.0 {
                    let mut pens = pens_in_rect(&self.data, &rect);
                    if modifiers.shift {
                        for &p in self.active.pens() {
                            if !pens.contains(&p) {
                                pens.push(p);
                            }
                        }
                    }
                    self.active.set(&self.data, pens);
                    self.emit_selection();
                }
                self.compositor.mark_active();
                true
            }
            Gesture::Move { moved: true, .. } => {
                self.commit_geometry();
                self.events.emit(TopologyEvent::Move(self.active.ids(&self.data)));
                true
            }
            Gesture::Resize { moved, .. } => {
                if moved {
                    self.commit_geometry();
                    self.events.emit(TopologyEvent::Resize(self.active.ids(&self.data)));
                }
                moved
            }
            Gesture::Rotate { moved, .. } => {
                if moved {
                    self.active.update_rotate(&self.data);
                    self.commit_geometry();
                    self.events.emit(TopologyEvent::Rotated(self.active.ids(&self.data)));
                }
                moved
            }
            Gesture::LineEnd { line, moved, .. } | Gesture::LineControl { line, moved, .. } => {
                if moved {
                    self.commit();
                    if let Some(id) = self.data.get(line).map(|p| p.id) {
                        self.events.emit(TopologyEvent::Move(vec![id]));
                    }
                }
                moved
            }
            Gesture::DrawLine => self.finish_line(drawing),
        }
    }

    /// Keep a drawn line if it ends on a node (or empty lines are allowed).
    fn finish_line(&mut self, drawing: Option<Pen>) -> bool {
        let Some(pen) = drawing else {
            return false;
        };
        let Some(line) = pen.as_line() else {
            return false;
        };
        let docked = line.to().is_docked();
        let degenerate = line.from().distance(*line.to()) < 1.0;
        if !docked && (!self.options.allow_empty_line || degenerate) {
            log::debug!("discarding drawn line without a target");
            return false;
        }
        let id = pen.id;
        let idx = self.data.add_pen(pen);
        self.data.init_pen(idx, &self.registry);
        self.active.set(&self.data, vec![idx]);
        self.commit();
        self.events.emit(TopologyEvent::AddLine(id));
        true
    }

    /// Commit a move/resize/rotate: moved children re-derive their
    /// parent-relative placement, then a history step is recorded.
    fn commit_geometry(&mut self) {
        for idx in self.active.pens().to_vec() {
            if self.data.parent(idx).is_some() {
                self.data.calc_rect_in_parent(idx);
            }
        }
        self.active.update_rect(&self.data);
        self.commit();
    }

    pub fn double_click(&mut self, pt: Point) -> bool {
        if self.data.locked == Lock::NoEvent {
            return false;
        }
        let target = hit_line(&self.data, pt, self.options.handle_padding)
            .map(|(i, _)| i)
            .or_else(|| hit_node(&self.data, pt, 0.0));
        match target {
            Some(idx) => {
                self.fire_bindings(idx, EventTrigger::DblClick);
                true
            }
            None => false,
        }
    }

    // ─── Cancellation ────────────────────────────────────────────────────

    /// Abort the gesture in flight, restoring pre-gesture geometry.
    fn cancel_gesture(&mut self) -> bool {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::None);
        self.dock.cleanup();
        self.hover.clear_transient();
        self.coalescer.take();
        let cancelled = match gesture {
            Gesture::None | Gesture::Click { .. } | Gesture::Marquee { .. } => false,
            Gesture::Move { .. } | Gesture::Resize { .. } | Gesture::Rotate { .. } => {
                self.active.restore(&mut self.data, &self.registry);
                true
            }
            Gesture::LineEnd { line, saved, .. } | Gesture::LineControl { line, saved, .. } => {
                if let Some(slot) = self.data.get_mut(line) {
                    *slot = *saved;
                }
                self.data.init_pen(line, &self.registry);
                self.active.update_rect(&self.data);
                true
            }
            Gesture::DrawLine => true,
        };
        self.compositor.mark_all();
        cancelled
    }

    /// Escape: abort the gesture in flight, or else drop the selection.
    pub fn cancel(&mut self) -> bool {
        if self.cancel_gesture() {
            return true;
        }
        if self.active.is_empty() {
            return false;
        }
        self.active.clear();
        self.compositor.mark_active();
        true
    }

    /// Focus left the host element.
    pub fn blur(&mut self) -> bool {
        self.cancel_gesture()
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Dispatch a key press. Returns whether it was handled.
    pub fn key_down(&mut self, key: &str, modifiers: Modifiers) -> bool {
        let Some(action) = ShortcutMap::resolve(key, modifiers) else {
            return false;
        };
        log::debug!("shortcut {action:?}");
        match action {
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::Delete => self.delete(),
            ShortcutAction::SelectAll => {
                self.select_all();
                true
            }
            ShortcutAction::Copy => self.copy().is_some(),
            ShortcutAction::Cut => self.cut().is_some(),
            ShortcutAction::Paste => self.paste(),
            ShortcutAction::Combine => self.combine(),
            ShortcutAction::Uncombine => self.uncombine(),
            ShortcutAction::SendBackward => self.down(),
            ShortcutAction::BringForward => self.up(),
            ShortcutAction::SendToBack => self.bottom(),
            ShortcutAction::BringToFront => self.top(),
            ShortcutAction::Nudge { dx, dy, fine } => {
                let step = if fine {
                    self.options.nudge_fine_step
                } else {
                    self.options.nudge_step
                };
                self.nudge(f64::from(dx) * step, f64::from(dy) * step)
            }
            ShortcutAction::Cancel => self.cancel(),
        }
    }

    /// Move the selection by a fixed offset.
    pub fn nudge(&mut self, dx: f64, dy: f64) -> bool {
        if !self.can_edit() || !self.active.movable(&self.data) || !matches!(self.gesture, Gesture::None) {
            return false;
        }
        self.active.save(&self.data);
        self.active.translate(&mut self.data, &self.registry, dx, dy);
        self.commit_geometry();
        self.events.emit(TopologyEvent::Move(self.active.ids(&self.data)));
        true
    }
}

fn same_spot(a: Point, b: Point) -> bool {
    a.x == b.x && a.y == b.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_NODES: &str = r#"{
        "pens": [
            { "id": "t_a", "name": "rectangle", "rect": { "x": 0, "y": 0, "width": 100, "height": 100 } },
            { "id": "t_b", "name": "rectangle", "rect": { "x": 300, "y": 0, "width": 100, "height": 100 } }
        ]
    }"#;

    #[test]
    fn press_precedence_prefers_nodes_over_marquee() {
        let mut topo = Topology::default();
        assert!(topo.open(TWO_NODES));
        topo.pointer_down(Point::new(50.0, 50.0), Modifiers::NONE);
        assert!(matches!(topo.gesture, Gesture::Move { .. }));
        topo.pointer_up(Point::new(50.0, 50.0), Modifiers::NONE);
        assert_eq!(topo.selection().len(), 1);

        topo.pointer_down(Point::new(200.0, 300.0), Modifiers::NONE);
        assert!(matches!(topo.gesture, Gesture::Marquee { .. }));
        assert!(topo.selection().is_empty());
    }

    #[test]
    fn drawing_from_an_anchor_to_another_adds_a_docked_line() {
        let mut topo = Topology::default();
        topo.open(TWO_NODES);
        topo.pointer_down(Point::new(100.0, 50.0), Modifiers::NONE);
        assert!(matches!(topo.gesture, Gesture::DrawLine));
        topo.pointer_move(Point::new(250.0, 50.0), Modifiers::NONE);
        topo.frame(16.0);
        assert!(topo.pointer_up(Point::new(300.0, 50.0), Modifiers::NONE));

        let lines: Vec<_> = topo.data.lines().collect();
        assert_eq!(lines.len(), 1);
        let line = topo.data.get(lines[0]).unwrap().as_line().unwrap();
        assert_eq!(line.from().owner, Some(PenId::intern("t_a")));
        assert_eq!(line.to().owner, Some(PenId::intern("t_b")));
        assert_eq!(line.to().anchor_index, Some(0));
    }

    #[test]
    fn undocked_drawn_line_is_discarded_by_default() {
        let mut topo = Topology::default();
        topo.open(TWO_NODES);
        topo.pointer_down(Point::new(100.0, 50.0), Modifiers::NONE);
        assert!(!topo.pointer_up(Point::new(200.0, 200.0), Modifiers::NONE));
        assert_eq!(topo.data.lines().count(), 0);
    }

    #[test]
    fn escape_restores_a_drag_in_flight() {
        let mut topo = Topology::default();
        topo.open(TWO_NODES);
        topo.pointer_down(Point::new(50.0, 50.0), Modifiers::NONE);
        topo.pointer_move(Point::new(70.0, 80.0), Modifiers::NONE);
        topo.frame(16.0);
        assert_eq!(topo.find("t_a").unwrap().rect().y, 30.0);
        assert!(topo.key_down("Escape", Modifiers::NONE));
        assert_eq!(topo.find("t_a").unwrap().rect(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(!topo.pointer_up(Point::new(70.0, 80.0), Modifiers::NONE));
    }

    #[test]
    fn unregistered_shape_is_rejected() {
        let mut topo = Topology::default();
        let pen = Pen::node(PenId::fresh(), topo_core::Node::new("nope", Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert!(topo.add_node(pen).is_none());
        assert!(topo.data.is_empty());
    }
}
