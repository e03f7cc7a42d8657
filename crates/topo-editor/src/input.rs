//! Input abstraction layer.
//!
//! Normalizes host pointer, wheel and keyboard events into `InputEvent`,
//! and coalesces pointer moves so at most one is processed per frame.

use topo_core::Point;

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn cmd(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64, modifiers: Modifiers },
    PointerMove { x: f64, y: f64, modifiers: Modifiers },
    PointerUp { x: f64, y: f64, modifiers: Modifiers },
    DoubleClick { x: f64, y: f64 },
    /// Scroll / pinch. `zoom` is a factor (1.0 = no change).
    Wheel { dx: f64, dy: f64, zoom: f64 },
    Key { key: String, modifiers: Modifiers },
    /// A pen dragged in from a host palette, as pen JSON.
    Drop { x: f64, y: f64, data: String },
    /// Focus left the host element.
    Blur,
}

impl InputEvent {
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y }
            | Self::Drop { x, y, .. } => Some(Point::new(*x, *y)),
            _ => None,
        }
    }
}

/// Keeps only the latest pointer move until the next frame runs.
///
/// `record` reports whether the host needs to request a frame: only the
/// first move after a frame does, later ones overwrite the pending data.
#[derive(Debug, Default)]
pub struct MoveCoalescer {
    pending: Option<(Point, Modifiers)>,
    scheduled: bool,
}

impl MoveCoalescer {
    pub fn record(&mut self, pt: Point, modifiers: Modifiers) -> bool {
        self.pending = Some((pt, modifiers));
        if self.scheduled {
            false
        } else {
            self.scheduled = true;
            true
        }
    }

    /// Hand out the latest move and clear the scheduled flag.
    pub fn take(&mut self) -> Option<(Point, Modifiers)> {
        self.scheduled = false;
        self.pending.take()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn moves_coalesce_to_the_last_one() {
        let mut c = MoveCoalescer::default();
        assert!(c.record(Point::new(1.0, 1.0), Modifiers::NONE));
        assert!(!c.record(Point::new(2.0, 2.0), Modifiers::NONE));
        assert!(!c.record(Point::new(3.0, 4.0), Modifiers::SHIFT));

        let (pt, mods) = c.take().unwrap();
        assert_eq!((pt.x, pt.y), (3.0, 4.0));
        assert!(mods.shift);
        assert!(c.take().is_none());
        assert!(c.record(Point::new(5.0, 5.0), Modifiers::NONE));
    }
}
