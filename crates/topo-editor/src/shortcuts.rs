//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The map lives
//! in Rust so it's shared across WASM and native hosts.

use crate::input::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Copy,
    Cut,
    Paste,
    Combine,
    Uncombine,

    // ── Z-order ──
    SendBackward,
    BringForward,
    SendToBack,
    BringToFront,

    /// Move the selection one step; `fine` picks the small step.
    Nudge { dx: i8, dy: i8, fine: bool },

    /// Escape: abort the gesture in flight, or drop the selection.
    Cancel,
}

/// Resolves key events into shortcut actions.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a `KeyboardEvent.key` value. `None` when unbound.
    pub fn resolve(key: &str, m: Modifiers) -> Option<ShortcutAction> {
        use ShortcutAction::*;

        if let Some((dx, dy)) = arrow(key) {
            return Some(Nudge {
                dx,
                dy,
                fine: m.shift || m.cmd() || m.alt,
            });
        }

        // ── Modifier combos first (most specific) ──
        if m.cmd() && m.shift {
            return match key {
                "z" | "Z" => Some(Redo),
                "g" | "G" => Some(Uncombine),
                "[" | "{" => Some(SendToBack),
                "]" | "}" => Some(BringToFront),
                _ => None,
            };
        }

        if m.cmd() {
            return match key {
                "z" | "Z" => Some(Undo),
                "y" | "Y" => Some(Redo),
                "a" | "A" => Some(SelectAll),
                "c" | "C" => Some(Copy),
                "x" | "X" => Some(Cut),
                "v" | "V" => Some(Paste),
                "g" | "G" => Some(Combine),
                "[" => Some(SendBackward),
                "]" => Some(BringForward),
                _ => None,
            };
        }

        match key {
            "Delete" | "Backspace" => Some(Delete),
            "Escape" => Some(Cancel),
            _ => None,
        }
    }
}

fn arrow(key: &str) -> Option<(i8, i8)> {
    match key {
        "ArrowLeft" => Some((-1, 0)),
        "ArrowRight" => Some((1, 0)),
        "ArrowUp" => Some((0, -1)),
        "ArrowDown" => Some((0, 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CMD: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
    const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    const CMD_SHIFT: Modifiers = Modifiers {
        meta: true,
        shift: true,
        ..Modifiers::NONE
    };

    #[test]
    fn resolve_undo_redo() {
        assert_eq!(ShortcutMap::resolve("z", CMD), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("z", CTRL), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("Z", CMD_SHIFT), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("y", CTRL), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("z", Modifiers::NONE), None);
    }

    #[test]
    fn resolve_clipboard_and_delete() {
        assert_eq!(ShortcutMap::resolve("c", CMD), Some(ShortcutAction::Copy));
        assert_eq!(ShortcutMap::resolve("x", CMD), Some(ShortcutAction::Cut));
        assert_eq!(ShortcutMap::resolve("v", CMD), Some(ShortcutAction::Paste));
        assert_eq!(
            ShortcutMap::resolve("Backspace", Modifiers::NONE),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Escape", Modifiers::NONE),
            Some(ShortcutAction::Cancel)
        );
    }

    #[test]
    fn arrows_nudge_with_fine_modifier() {
        assert_eq!(
            ShortcutMap::resolve("ArrowLeft", Modifiers::NONE),
            Some(ShortcutAction::Nudge {
                dx: -1,
                dy: 0,
                fine: false
            })
        );
        assert_eq!(
            ShortcutMap::resolve("ArrowDown", Modifiers::SHIFT),
            Some(ShortcutAction::Nudge {
                dx: 0,
                dy: 1,
                fine: true
            })
        );
    }

    #[test]
    fn resolve_z_order_and_grouping() {
        assert_eq!(ShortcutMap::resolve("[", CMD), Some(ShortcutAction::SendBackward));
        assert_eq!(ShortcutMap::resolve("]", CMD_SHIFT), Some(ShortcutAction::BringToFront));
        assert_eq!(ShortcutMap::resolve("g", CMD), Some(ShortcutAction::Combine));
        assert_eq!(ShortcutMap::resolve("g", CMD_SHIFT), Some(ShortcutAction::Uncombine));
    }
}
