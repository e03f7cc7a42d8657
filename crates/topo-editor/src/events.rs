//! Named lifecycle events for the host UI.
//!
//! The controller owns one [`EventBus`]. Events queue there for the host
//! to drain, and are also handed to an optional hook as they fire.

use topo_core::{Lock, PenId};

#[derive(Debug, Clone, PartialEq)]
pub enum TopologyEvent {
    /// A single node became the selection.
    Node(PenId),
    /// A single line became the selection.
    Line(PenId),
    /// Several pens are selected.
    Multi(Vec<PenId>),
    /// The selection was cleared by clicking empty space.
    Space,
    AddNode(PenId),
    AddLine(PenId),
    Delete(Vec<PenId>),
    Resize(Vec<PenId>),
    Move(Vec<PenId>),
    Rotated(Vec<PenId>),
    Scale(f64),
    Translate { dx: f64, dy: f64 },
    Locked(Lock),
    Undo,
    Redo,
    Cut(Vec<PenId>),
    Copy(Vec<PenId>),
    Paste(Vec<PenId>),
    Combine(PenId),
    Uncombine(PenId),
    AnimateStart(PenId),
    AnimateEnd(PenId),
    /// A click binding asked the host to navigate.
    Link { pen: PenId, url: String },
    /// A click binding asked the host to run a named function.
    Function { pen: PenId, name: String },
    /// A deleted node owned this host overlay element.
    RemoveElement(String),
    Open,
    Clear,
}

impl TopologyEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Line(_) => "line",
            Self::Multi(_) => "multi",
            Self::Space => "space",
            Self::AddNode(_) => "addNode",
            Self::AddLine(_) => "addLine",
            Self::Delete(_) => "delete",
            Self::Resize(_) => "resize",
            Self::Move(_) => "move",
            Self::Rotated(_) => "rotated",
            Self::Scale(_) => "scale",
            Self::Translate { .. } => "translate",
            Self::Locked(_) => "locked",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Cut(_) => "cut",
            Self::Copy(_) => "copy",
            Self::Paste(_) => "paste",
            Self::Combine(_) => "combine",
            Self::Uncombine(_) => "uncombine",
            Self::AnimateStart(_) => "animateStart",
            Self::AnimateEnd(_) => "animateEnd",
            Self::Link { .. } => "link",
            Self::Function { .. } => "function",
            Self::RemoveElement(_) => "removeElement",
            Self::Open => "open",
            Self::Clear => "clear",
        }
    }

    /// Pens the event is about, for hosts that only need ids.
    pub fn pens(&self) -> Vec<PenId> {
        match self {
            Self::Node(id)
            | Self::Line(id)
            | Self::AddNode(id)
            | Self::AddLine(id)
            | Self::Combine(id)
            | Self::Uncombine(id)
            | Self::AnimateStart(id)
            | Self::AnimateEnd(id)
            | Self::Link { pen: id, .. }
            | Self::Function { pen: id, .. } => vec![*id],
            Self::Multi(ids)
            | Self::Delete(ids)
            | Self::Resize(ids)
            | Self::Move(ids)
            | Self::Rotated(ids)
            | Self::Cut(ids)
            | Self::Copy(ids)
            | Self::Paste(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }
}

pub type EventHook = Box<dyn FnMut(&TopologyEvent)>;

#[derive(Default)]
pub struct EventBus {
    queue: Vec<TopologyEvent>,
    hook: Option<EventHook>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue", &self.queue)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl EventBus {
    pub fn set_hook(&mut self, hook: impl FnMut(&TopologyEvent) + 'static) {
        self.hook = Some(Box::new(hook));
    }

    pub fn emit(&mut self, event: TopologyEvent) {
        log::debug!("event {}", event.name());
        if let Some(hook) = &mut self.hook {
            hook(&event);
        }
        self.queue.push(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<TopologyEvent> {
        std::mem::take(&mut self.queue)
    }

    pub fn pending(&self) -> &[TopologyEvent] {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn hook_sees_events_and_queue_drains() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut bus = EventBus::default();
        bus.set_hook(move |e| sink.borrow_mut().push(e.name()));

        bus.emit(TopologyEvent::AddNode(PenId::intern("ev_a")));
        bus.emit(TopologyEvent::Locked(Lock::Readonly));

        assert_eq!(*seen.borrow(), vec!["addNode", "locked"]);
        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].pens(), vec![PenId::intern("ev_a")]);
        assert!(bus.pending().is_empty());
    }
}
