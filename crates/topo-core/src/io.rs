//! Document (de)serialization.
//!
//! The JSON shape is `{ pens: [...], lineName, fromArrow, toArrow, scale,
//! locked, ... }` with camelCase keys. A pen is a line when it has both
//! `from` and `to`; anything else is a node, with nested `children`.
//! Missing fields take their defaults and malformed pens are skipped, so
//! partial documents still load.
//!
//! History snapshots reuse the same file structs encoded as MessagePack.

use crate::document::{Lock, TopologyData};
use crate::id::PenId;
use crate::line::{Line, LineKind};
use crate::node::Node;
use crate::pen::{Pen, PenBase, PenIndex, PenKind};
use crate::registry::ShapeRegistry;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFile {
    #[serde(default)]
    pub id: Option<PenId>,
    #[serde(flatten)]
    pub base: PenBase,
    #[serde(flatten)]
    pub line: Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFile {
    #[serde(default)]
    pub id: Option<PenId>,
    #[serde(flatten)]
    pub base: PenBase,
    #[serde(flatten)]
    pub node: Node,
    #[serde(
        default,
        deserialize_with = "lenient_pens",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<PenFile>,
}

/// One serialized pen. Lines are tried first: they require `from`/`to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PenFile {
    Line(LineFile),
    Node(NodeFile),
}

impl PenFile {
    pub fn id(&self) -> Option<PenId> {
        match self {
            PenFile::Line(l) => l.id,
            PenFile::Node(n) => n.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentFile {
    #[serde(deserialize_with = "lenient_pens")]
    pub pens: Vec<PenFile>,
    pub line_name: LineKind,
    pub from_arrow: Option<String>,
    pub to_arrow: Option<String>,
    pub scale: f64,
    pub locked: Lock,
    pub bk_color: Option<String>,
    pub grid: bool,
}

impl Default for DocumentFile {
    fn default() -> Self {
        let doc = TopologyData::new();
        Self {
            pens: Vec::new(),
            line_name: doc.line_kind,
            from_arrow: doc.from_arrow,
            to_arrow: doc.to_arrow,
            scale: doc.scale,
            locked: doc.locked,
            bk_color: None,
            grid: false,
        }
    }
}

/// Deserialize a pen list, dropping entries that are neither a line nor
/// a node.
fn lenient_pens<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<PenFile>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MaybePen {
        Pen(PenFile),
        Invalid(serde::de::IgnoredAny),
    }
    let raw = Vec::<MaybePen>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|p| match p {
            MaybePen::Pen(pen) => Some(pen),
            MaybePen::Invalid(_) => {
                log::warn!("skipping malformed pen");
                None
            }
        })
        .collect())
}

impl TopologyData {
    /// Parse a JSON document and initialise all derived geometry.
    pub fn from_json(json: &str, registry: &ShapeRegistry) -> Result<Self, String> {
        let file: DocumentFile =
            serde_json::from_str(json).map_err(|e| format!("invalid document: {e}"))?;
        Ok(Self::from_file(file, registry))
    }

    pub fn from_file(file: DocumentFile, registry: &ShapeRegistry) -> Self {
        let mut doc = TopologyData {
            line_kind: file.line_name,
            from_arrow: file.from_arrow,
            to_arrow: file.to_arrow,
            scale: if file.scale > 0.0 { file.scale } else { 1.0 },
            locked: file.locked,
            bk_color: file.bk_color,
            grid: file.grid,
            ..TopologyData::new()
        };
        for pen in file.pens {
            doc.insert_file(pen, None);
        }
        doc.init_all(registry);
        log::debug!("document loaded: {} pens", doc.len());
        doc
    }

    /// Insert a serialized pen (and its children) under `parent`, or at
    /// the top level. Derived geometry is left to the caller.
    pub fn insert_file(&mut self, file: PenFile, parent: Option<PenIndex>) -> PenIndex {
        let (pen, children) = match file {
            PenFile::Line(l) => (
                Pen {
                    id: l.id.unwrap_or_else(PenId::fresh),
                    base: l.base,
                    kind: PenKind::Line(l.line),
                },
                Vec::new(),
            ),
            PenFile::Node(n) => (
                Pen {
                    id: n.id.unwrap_or_else(PenId::fresh),
                    base: n.base,
                    kind: PenKind::Node(n.node),
                },
                n.children,
            ),
        };
        let idx = match parent {
            Some(p) => self.add_child(p, pen),
            None => self.add_pen(pen),
        };
        for child in children {
            if matches!(child, PenFile::Line(_)) {
                log::warn!("lines cannot be nested; promoting to top level");
                self.insert_file(child, None);
            } else {
                self.insert_file(child, Some(idx));
            }
        }
        idx
    }

    /// Serialize one pen with its nested children.
    pub fn pen_to_file(&self, idx: PenIndex) -> Option<PenFile> {
        let pen = self.get(idx)?;
        Some(match &pen.kind {
            PenKind::Line(line) => PenFile::Line(LineFile {
                id: Some(pen.id),
                base: pen.base.clone(),
                line: line.clone(),
            }),
            PenKind::Node(node) => PenFile::Node(NodeFile {
                id: Some(pen.id),
                base: pen.base.clone(),
                node: node.clone(),
                children: self
                    .children(idx)
                    .iter()
                    .filter_map(|&c| self.pen_to_file(c))
                    .collect(),
            }),
        })
    }

    pub fn to_file(&self) -> DocumentFile {
        DocumentFile {
            pens: self
                .pens
                .iter()
                .filter_map(|&i| self.pen_to_file(i))
                .collect(),
            line_name: self.line_kind,
            from_arrow: self.from_arrow.clone(),
            to_arrow: self.to_arrow.clone(),
            scale: self.scale,
            locked: self.locked,
            bk_color: self.bk_color.clone(),
            grid: self.grid,
        }
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(&self.to_file()).map_err(|e| format!("serialize failed: {e}"))
    }

    /// Compact binary snapshot for the history buffer.
    pub fn snapshot(&self) -> Result<Vec<u8>, String> {
        rmp_serde::to_vec_named(&self.to_file()).map_err(|e| format!("snapshot failed: {e}"))
    }

    pub fn from_snapshot(bytes: &[u8], registry: &ShapeRegistry) -> Result<Self, String> {
        let file: DocumentFile =
            rmp_serde::from_slice(bytes).map_err(|e| format!("corrupt snapshot: {e}"))?;
        Ok(Self::from_file(file, registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r##"{
        "pens": [
            { "id": "io_a", "name": "rectangle", "rect": { "x": 0, "y": 0, "width": 100, "height": 100 },
              "text": "A", "strokeStyle": "#1890ff",
              "children": [
                { "id": "io_child", "name": "circle", "rect": { "x": 10, "y": 10, "width": 20, "height": 20 } }
              ] },
            { "id": "io_l", "name": "curve",
              "from": { "x": 100, "y": 50, "direction": "right", "anchorIndex": 2, "ownerId": "io_a" },
              "to": { "x": 300, "y": 50 } },
            42
        ],
        "lineName": "polyline",
        "locked": 2
    }"##;

    #[test]
    fn lines_are_discriminated_by_endpoints() {
        let registry = ShapeRegistry::new();
        let doc = TopologyData::from_json(DOC, &registry).unwrap();
        assert_eq!(doc.pens.len(), 2);
        assert!(doc.graph[doc.pens[0]].is_node());
        assert!(doc.graph[doc.pens[1]].is_line());
        assert_eq!(doc.line_kind, LineKind::Polyline);
        assert_eq!(doc.locked, Lock::NoMove);

        let a = doc.pens[0];
        assert_eq!(doc.children(a).len(), 1);
        assert_eq!(doc.graph[a].base.style.stroke_style, "#1890ff");
        let line = doc.graph[doc.pens[1]].as_line().unwrap();
        assert_eq!(line.from().owner, Some(PenId::intern("io_a")));
        assert_eq!(line.kind, LineKind::Curve);
    }

    #[test]
    fn partial_documents_load_with_defaults() {
        let registry = ShapeRegistry::new();
        let doc = TopologyData::from_json("{}", &registry).unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.scale, 1.0);
        assert!(TopologyData::from_json("not json", &registry).is_err());
    }

    #[test]
    fn json_and_snapshot_round_trip() {
        let registry = ShapeRegistry::new();
        let doc = TopologyData::from_json(DOC, &registry).unwrap();
        let file = doc.to_file();

        let json = doc.to_json().unwrap();
        let reparsed = TopologyData::from_json(&json, &registry).unwrap();
        assert_eq!(reparsed.to_file(), file);

        let bytes = doc.snapshot().unwrap();
        let restored = TopologyData::from_snapshot(&bytes, &registry).unwrap();
        assert_eq!(restored.to_file(), file);
    }
}
