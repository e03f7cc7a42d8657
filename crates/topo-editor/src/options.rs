//! Editor tuning knobs.
//!
//! Hosts may pass a JSON blob; every field is optional and falls back to
//! the defaults below.

use serde::Deserialize;
use topo_core::LineKind;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Maximum number of history snapshots kept.
    pub history_capacity: usize,
    /// Distance within which a dragged key point snaps to another node's.
    pub dock_threshold: f64,
    /// Gap between the top edge and the rotate handle.
    pub rotate_handle_offset: f64,
    /// Pick tolerance around handles and line bodies.
    pub handle_padding: f64,
    pub anchor_radius: f64,
    /// Smallest width/height a resize may produce.
    pub min_size: f64,
    pub nudge_step: f64,
    pub nudge_fine_step: f64,
    /// Keep drawn lines whose end is not docked to a node.
    pub allow_empty_line: bool,
    pub hide_rotate_handle: bool,
    pub hide_size_handles: bool,
    pub hide_anchors: bool,
    /// Minimum time between effective animation ticks.
    pub frame_interval_ms: f64,
    /// Offset applied to each successive paste.
    pub paste_offset: f64,
    pub line_kind: Option<LineKind>,
    pub from_arrow: Option<String>,
    pub to_arrow: Option<String>,
    /// Color of selection outlines, handles and guides.
    pub active_color: String,
    pub hover_color: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            dock_threshold: 10.0,
            rotate_handle_offset: 35.0,
            handle_padding: 5.0,
            anchor_radius: 5.0,
            min_size: 10.0,
            nudge_step: 5.0,
            nudge_fine_step: 1.0,
            allow_empty_line: false,
            hide_rotate_handle: false,
            hide_size_handles: false,
            hide_anchors: false,
            frame_interval_ms: 30.0,
            paste_offset: 20.0,
            line_kind: None,
            from_arrow: None,
            to_arrow: None,
            active_color: "#1890ff".to_string(),
            hover_color: "#ff6600".to_string(),
        }
    }
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid options: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_blob_keeps_defaults() {
        let opts = Options::from_json(r#"{ "historyCapacity": 3, "lineKind": "polyline" }"#).unwrap();
        assert_eq!(opts.history_capacity, 3);
        assert_eq!(opts.line_kind, Some(LineKind::Polyline));
        assert_eq!(opts.dock_threshold, 10.0);
        assert!(Options::from_json("[]").is_err());
    }
}
