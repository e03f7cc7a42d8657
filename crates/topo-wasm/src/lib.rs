//! WASM bridge for Topo: exposes the diagram controller to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host owns the canvas
//! and the `requestAnimationFrame` loop; it forwards DOM events here and
//! calls `frame` + `render` whenever a method reports that a frame is
//! wanted. Structured data crosses the boundary as JSON strings.

mod canvas2d;

use serde_json::{Value, json};
use topo_core::{LineKind, Lock, PenId, Point, Rect};
use topo_editor::{Align, InputEvent, Modifiers, Options, Topology, TopologyEvent};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

use crate::canvas2d::Canvas2d;

/// The main WASM-facing canvas controller.
#[wasm_bindgen]
pub struct TopoCanvas {
    topo: Topology,
    width: f64,
    height: f64,
}

#[wasm_bindgen]
impl TopoCanvas {
    /// Create a controller with default options for a canvas of this size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        Self::build(width, height, Options::default())
    }

    /// Like `new`, with an options JSON blob. `undefined` if it is invalid.
    pub fn with_options(width: f64, height: f64, options: &str) -> Option<TopoCanvas> {
        match Options::from_json(options) {
            Ok(opts) => Some(Self::build(width, height, opts)),
            Err(e) => {
                log::error!("{e}");
                None
            }
        }
    }

    /// Load a document. Returns `false` if it does not parse.
    pub fn open(&mut self, json: &str) -> bool {
        self.topo.open(json)
    }

    /// The document as JSON, or an empty string if it cannot be written.
    pub fn to_json(&self) -> String {
        self.topo.to_json().unwrap_or_else(|e| {
            log::error!("{e}");
            String::new()
        })
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.topo.set_viewport(Rect::new(0.0, 0.0, width, height));
    }

    // ─── Frame loop ──────────────────────────────────────────────────────

    /// Whether the host should request an animation frame.
    pub fn needs_frame(&self) -> bool {
        self.topo.needs_frame()
    }

    /// Advance to `time_ms`. Returns whether another frame is wanted.
    pub fn frame(&mut self, time_ms: f64) -> bool {
        self.topo.frame(time_ms)
    }

    /// Paint onto the context. Returns `false` when nothing changed.
    pub fn render(&mut self, ctx: &CanvasRenderingContext2d) -> bool {
        self.topo.paint(&mut Canvas2d::new(ctx))
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Returns true if the view changed.
    pub fn handle_pointer_down(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let mods = modifiers(shift, ctrl, alt, meta);
        self.topo.pointer_down(Point::new(x, y), mods)
    }

    /// Returns true if the host must request a frame for this move.
    pub fn handle_pointer_move(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let mods = modifiers(shift, ctrl, alt, meta);
        self.topo.pointer_move(Point::new(x, y), mods)
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let mods = modifiers(shift, ctrl, alt, meta);
        self.topo.pointer_up(Point::new(x, y), mods)
    }

    pub fn handle_double_click(&mut self, x: f64, y: f64) -> bool {
        self.topo.double_click(Point::new(x, y))
    }

    /// Handle a `KeyboardEvent.key`. Returns whether it was consumed.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> bool {
        self.topo.key_down(key, modifiers(shift, ctrl, alt, meta))
    }

    /// Wheel at `(x, y)`: zooms when `zoom != 1`, otherwise pans.
    pub fn handle_wheel(&mut self, x: f64, y: f64, dx: f64, dy: f64, zoom: f64) -> bool {
        self.topo.wheel(dx, dy, zoom, Point::new(x, y))
    }

    /// A palette item dropped at `(x, y)`; `data` is pen JSON.
    pub fn handle_drop(&mut self, x: f64, y: f64, data: &str) -> bool {
        self.topo.handle(&InputEvent::Drop {
            x,
            y,
            data: data.to_string(),
        })
    }

    pub fn handle_blur(&mut self) -> bool {
        self.topo.blur()
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.topo.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.topo.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.topo.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.topo.history().can_redo()
    }

    pub fn delete_selected(&mut self) -> bool {
        self.topo.delete()
    }

    /// Clipboard JSON of the selection, or an empty string.
    pub fn copy(&mut self) -> String {
        self.topo.copy().unwrap_or_default()
    }

    pub fn cut(&mut self) -> String {
        self.topo.cut().unwrap_or_default()
    }

    /// Paste JSON from the system clipboard.
    pub fn paste(&mut self, json: &str) -> bool {
        self.topo.paste_text(json)
    }

    pub fn combine(&mut self) -> bool {
        self.topo.combine()
    }

    pub fn uncombine(&mut self) -> bool {
        self.topo.uncombine()
    }

    pub fn bring_to_front(&mut self) -> bool {
        self.topo.top()
    }

    pub fn send_to_back(&mut self) -> bool {
        self.topo.bottom()
    }

    pub fn bring_forward(&mut self) -> bool {
        self.topo.up()
    }

    pub fn send_backward(&mut self) -> bool {
        self.topo.down()
    }

    /// `left`, `right`, `top`, `bottom`, `center` or `middle`.
    pub fn align(&mut self, how: &str) -> bool {
        match parse_align(how) {
            Some(how) => self.topo.align_selection(how),
            None => false,
        }
    }

    pub fn space_between(&mut self, horizontal: bool) -> bool {
        self.topo.space_between(horizontal)
    }

    /// Lock level: 0 none, 1 readonly, 2 no-move, 10 no-event.
    pub fn lock(&mut self, level: u8) -> bool {
        match Lock::try_from(level) {
            Ok(lock) => self.topo.lock(lock),
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) -> bool {
        self.topo.translate(dx, dy)
    }

    pub fn scale(&mut self, factor: f64, cx: f64, cy: f64) -> bool {
        self.topo.scale(factor, Point::new(cx, cy))
    }

    pub fn scale_to(&mut self, target: f64, cx: f64, cy: f64) -> bool {
        self.topo.scale_to(target, Point::new(cx, cy))
    }

    /// `line`, `polyline` or `curve`.
    pub fn set_line_kind(&mut self, name: &str) -> bool {
        match serde_json::from_value::<LineKind>(Value::String(name.to_string())) {
            Ok(kind) => self.topo.set_line_kind(kind),
            Err(_) => false,
        }
    }

    /// Start the pen with this id, or every pen with this tag.
    pub fn start_animate(&mut self, target: &str) -> bool {
        self.topo.start_animate(target)
    }

    /// Stop one pen's animation, or all when `id` is empty.
    pub fn stop_animate(&mut self, id: &str) -> bool {
        let id = (!id.is_empty()).then(|| PenId::intern(id));
        self.topo.stop_animate(id)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// JSON array of selected pen ids.
    pub fn get_selected_ids(&self) -> String {
        let ids: Vec<&str> = self
            .topo
            .selection()
            .iter()
            .filter_map(|&i| self.topo.data.get(i))
            .map(|p| p.id.as_str())
            .collect();
        json!(ids).to_string()
    }

    /// Select pens from a JSON array of ids.
    pub fn select_by_ids(&mut self, ids: &str) -> bool {
        let Ok(ids) = serde_json::from_str::<Vec<String>>(ids) else {
            return false;
        };
        let ids: Vec<PenId> = ids.iter().map(|s| PenId::intern(s)).collect();
        self.topo.select(&ids);
        true
    }

    pub fn select_all(&mut self) {
        self.topo.select_all();
    }

    /// The pen as document JSON, or an empty string when absent.
    pub fn find(&self, id: &str) -> String {
        self.topo
            .data
            .index_of(PenId::intern(id))
            .and_then(|i| self.topo.data.pen_to_file(i))
            .and_then(|file| serde_json::to_string(&file).ok())
            .unwrap_or_default()
    }

    /// JSON array of ids of pens carrying `tag`.
    pub fn find_by_tag(&self, tag: &str) -> String {
        let ids: Vec<&str> = self.topo.find_by_tag(tag).into_iter().map(|p| p.id.as_str()).collect();
        json!(ids).to_string()
    }

    /// Bounding box of the document as `{"x","y","width","height"}`.
    pub fn get_rect(&self) -> String {
        let r = self.topo.get_rect();
        json!({ "x": r.x, "y": r.y, "width": r.width, "height": r.height }).to_string()
    }

    /// Take queued lifecycle events as a JSON array of
    /// `{"type": name, "pens": [ids], ...}` objects, oldest first.
    pub fn drain_events(&mut self) -> String {
        let events: Vec<Value> = self.topo.events().drain().iter().map(event_json).collect();
        Value::Array(events).to_string()
    }
}

impl TopoCanvas {
    fn build(width: f64, height: f64, options: Options) -> Self {
        console_setup();
        let mut topo = Topology::new(options);
        topo.set_viewport(Rect::new(0.0, 0.0, width, height));
        Self { topo, width, height }
    }

    /// The wrapped controller, for Rust hosts embedding the bridge.
    pub fn topology(&mut self) -> &mut Topology {
        &mut self.topo
    }
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn parse_align(how: &str) -> Option<Align> {
    Some(match how {
        "left" => Align::Left,
        "right" => Align::Right,
        "top" => Align::Top,
        "bottom" => Align::Bottom,
        "center" => Align::Center,
        "middle" => Align::Middle,
        _ => return None,
    })
}

fn event_json(event: &TopologyEvent) -> Value {
    let ids = event.pens();
    let pens: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
    let mut out = json!({ "type": event.name(), "pens": pens });
    let extra = match event {
        TopologyEvent::Scale(scale) => json!({ "scale": scale }),
        TopologyEvent::Translate { dx, dy } => json!({ "dx": dx, "dy": dy }),
        TopologyEvent::Locked(lock) => json!({ "lock": u8::from(*lock) }),
        TopologyEvent::Link { url, .. } => json!({ "url": url }),
        TopologyEvent::Function { name, .. } => json!({ "name": name }),
        TopologyEvent::RemoveElement(element) => json!({ "element": element }),
        _ => return out,
    };
    if let (Some(out), Value::Object(extra)) = (out.as_object_mut(), extra) {
        out.extend(extra);
    }
    out
}

// ─── Console ─────────────────────────────────────────────────────────────

/// Forwards `log` records to the browser console.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = format!("[topo] {}", record.args());
        #[cfg(target_arch = "wasm32")]
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg.into()),
            log::Level::Warn => web_sys::console::warn_1(&msg.into()),
            _ => web_sys::console::log_1(&msg.into()),
        }
        #[cfg(not(target_arch = "wasm32"))]
        let _ = msg;
    }

    fn flush(&self) {}
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
static LOGGER: ConsoleLogger = ConsoleLogger;

fn console_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Topo WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(log::LevelFilter::Warn);
            }
        });
    }
}

/// Console verbosity: `error`, `warn`, `info`, `debug` or `trace`.
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> bool {
    match level.parse::<log::LevelFilter>() {
        Ok(filter) => {
            log::set_max_level(filter);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"{
        "pens": [
            { "id": "w_a", "name": "rectangle", "rect": { "x": 0, "y": 0, "width": 100, "height": 100 } },
            { "id": "w_b", "name": "circle", "rect": { "x": 200, "y": 20, "width": 50, "height": 50 }, "tags": ["dot"] }
        ]
    }"#;

    #[test]
    fn pointer_gesture_selects_moves_and_reports_events() {
        let mut canvas = TopoCanvas::new(800.0, 600.0);
        assert!(canvas.open(DOC));
        assert!(!canvas.can_undo());
        assert!(canvas.handle_pointer_down(50.0, 50.0, false, false, false, false));
        assert!(canvas.handle_pointer_up(60.0, 50.0, false, false, false, false));
        assert_eq!(canvas.get_selected_ids(), r#"["w_a"]"#);
        assert!(canvas.can_undo());
        assert!(!canvas.can_redo());

        let events: Vec<Value> = serde_json::from_str(&canvas.drain_events()).unwrap();
        let names: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
        assert_eq!(names, vec!["open", "node", "move"]);
        assert_eq!(events[2]["pens"], json!(["w_a"]));
        assert_eq!(canvas.drain_events(), "[]");
    }

    #[test]
    fn lock_levels_and_extras_serialize() {
        let mut canvas = TopoCanvas::new(100.0, 100.0);
        assert!(!canvas.lock(7));
        assert!(canvas.lock(10));
        let events: Vec<Value> = serde_json::from_str(&canvas.drain_events()).unwrap();
        assert_eq!(events[0], json!({ "type": "locked", "pens": [], "lock": 10 }));
    }

    #[test]
    fn queries_return_json() {
        let mut canvas = TopoCanvas::new(800.0, 600.0);
        canvas.open(DOC);
        assert_eq!(canvas.find_by_tag("dot"), r#"["w_b"]"#);
        assert!(canvas.find("w_b").contains(r#""name":"circle""#));
        assert_eq!(canvas.find("missing"), "");
        let rect: Value = serde_json::from_str(&canvas.get_rect()).unwrap();
        assert_eq!(rect["width"], json!(250.0));
        assert!(canvas.select_by_ids(r#"["w_a","w_b"]"#));
        assert!(!canvas.select_by_ids("nope"));
        assert!(canvas.align("top"));
        assert!(!canvas.align("diagonal"));
        assert!(canvas.set_line_kind("polyline"));
        assert!(!canvas.set_line_kind("zigzag"));
    }

    #[test]
    fn invalid_options_yield_none() {
        assert!(TopoCanvas::with_options(10.0, 10.0, "[]").is_none());
        assert!(TopoCanvas::with_options(10.0, 10.0, r#"{"nudgeStep": 2}"#).is_some());
    }
}
