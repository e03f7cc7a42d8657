//! Cut / copy / paste of serialized pen clones.
//!
//! The clipboard holds the selection as a JSON array of pen files, the
//! same shape documents use, so a host can round-trip it through the
//! system clipboard. Pasting assigns a fresh id to every pen (children
//! included), rewires line ends docked to pens in the same batch and
//! undocks the rest.

use std::collections::HashMap;
use topo_core::{PenFile, PenId, PenIndex, ShapeRegistry, TopologyData};

#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    data: Option<String>,
    /// Pastes since the last copy; each one lands a step further away.
    pastes: u32,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn contents(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Serialize `pens` (skipping ones nested under another copied pen)
    /// and keep the result.
    pub fn copy(&mut self, doc: &TopologyData, pens: &[PenIndex]) -> Result<String, String> {
        let files: Vec<PenFile> = pens
            .iter()
            .copied()
            .filter(|&i| !has_ancestor_in(doc, i, pens))
            .filter_map(|i| doc.pen_to_file(i))
            .collect();
        if files.is_empty() {
            return Err("nothing to copy".into());
        }
        let json = serde_json::to_string(&files).map_err(|e| format!("copy failed: {e}"))?;
        self.data = Some(json.clone());
        self.pastes = 0;
        Ok(json)
    }

    /// Load clipboard text from the host.
    pub fn set(&mut self, json: impl Into<String>) {
        self.data = Some(json.into());
        self.pastes = 0;
    }

    /// Insert the clipboard contents as new top-level pens, offset by
    /// `offset` per paste.
    pub fn paste(
        &mut self,
        doc: &mut TopologyData,
        registry: &ShapeRegistry,
        offset: f64,
    ) -> Result<Vec<PenIndex>, String> {
        let json = self.data.as_deref().ok_or("clipboard is empty")?;
        let files: Vec<PenFile> =
            serde_json::from_str(json).map_err(|e| format!("invalid clipboard: {e}"))?;
        self.pastes += 1;
        let shift = offset * f64::from(self.pastes);
        let inserted = insert_files(doc, registry, files, shift, shift);
        log::debug!("pasted {} pens", inserted.len());
        Ok(inserted)
    }
}

/// Insert serialized pens as new top-level pens moved by `(dx, dy)`.
/// Every pen gets a fresh id; line ends docked inside the batch follow
/// their owners, the rest are undocked.
pub fn insert_files(
    doc: &mut TopologyData,
    registry: &ShapeRegistry,
    mut files: Vec<PenFile>,
    dx: f64,
    dy: f64,
) -> Vec<PenIndex> {
    let mut ids = HashMap::new();
    for file in &mut files {
        assign_fresh_ids(file, &mut ids);
    }
    for file in &mut files {
        relink(file, &ids, dx, dy);
    }
    let inserted: Vec<PenIndex> = files
        .into_iter()
        .map(|file| doc.insert_file(file, None))
        .collect();
    for &idx in &inserted {
        doc.init_pen(idx, registry);
    }
    inserted
}

fn has_ancestor_in(doc: &TopologyData, idx: PenIndex, set: &[PenIndex]) -> bool {
    let mut cur = doc.parent(idx);
    while let Some(p) = cur {
        if set.contains(&p) {
            return true;
        }
        cur = doc.parent(p);
    }
    false
}

fn assign_fresh_ids(file: &mut PenFile, ids: &mut HashMap<PenId, PenId>) {
    let fresh = PenId::fresh();
    match file {
        PenFile::Line(l) => {
            if let Some(old) = l.id.replace(fresh) {
                ids.insert(old, fresh);
            }
        }
        PenFile::Node(n) => {
            if let Some(old) = n.id.replace(fresh) {
                ids.insert(old, fresh);
            }
            for child in &mut n.children {
                assign_fresh_ids(child, ids);
            }
        }
    }
}

/// Shift geometry and point line ends at the pasted owners.
fn relink(file: &mut PenFile, ids: &HashMap<PenId, PenId>, dx: f64, dy: f64) {
    match file {
        PenFile::Line(l) => {
            l.line.translate(dx, dy);
            for end in [topo_core::LineEnd::From, topo_core::LineEnd::To] {
                let p = l.line.end_mut(end);
                match p.owner.and_then(|o| ids.get(&o)) {
                    Some(&new) => p.owner = Some(new),
                    None => p.undock(),
                }
            }
        }
        PenFile::Node(n) => {
            n.node.rect.translate(dx, dy);
            for child in &mut n.children {
                relink(child, ids, dx, dy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topo_core::{Line, LineKind, Node, Pen, Point, Rect};

    #[test]
    fn paste_remaps_owned_ends_and_undocks_the_rest() {
        let registry = ShapeRegistry::new();
        let mut doc = TopologyData::new();
        let a = doc.add_pen(Pen::node(
            PenId::intern("clip_a"),
            Node::new("rectangle", Rect::new(0.0, 0.0, 100.0, 100.0)),
        ));
        let mut from = Point::new(100.0, 50.0);
        from.owner = Some(PenId::intern("clip_a"));
        from.anchor_index = Some(1);
        let mut to = Point::new(300.0, 50.0);
        to.owner = Some(PenId::intern("clip_elsewhere"));
        let l = doc.add_pen(Pen::line(PenId::intern("clip_l"), Line::new(LineKind::Straight, from, to)));
        doc.init_all(&registry);

        let mut clip = Clipboard::new();
        clip.copy(&doc, &[a, l]).unwrap();
        let pasted = clip.paste(&mut doc, &registry, 20.0).unwrap();
        assert_eq!(pasted.len(), 2);
        assert_eq!(doc.len(), 4);

        let node = doc.get(pasted[0]).unwrap();
        assert_ne!(node.id, PenId::intern("clip_a"));
        assert_eq!(node.rect(), Rect::new(20.0, 20.0, 100.0, 100.0));
        let line = doc.get(pasted[1]).unwrap().as_line().unwrap();
        assert_eq!(line.from().owner, Some(node.id));
        assert_eq!(line.to().owner, None);

        let again = clip.paste(&mut doc, &registry, 20.0).unwrap();
        assert_eq!(doc.get(again[0]).unwrap().rect().x, 40.0);
    }

    #[test]
    fn children_get_fresh_ids_and_only_roots_are_copied() {
        let registry = ShapeRegistry::new();
        let mut doc = TopologyData::new();
        let parent = doc.add_pen(Pen::node(
            PenId::intern("clip_p"),
            Node::new("rectangle", Rect::new(0.0, 0.0, 100.0, 100.0)),
        ));
        let child = doc.add_child(
            parent,
            Pen::node(PenId::intern("clip_c"), Node::new("circle", Rect::new(10.0, 10.0, 20.0, 20.0))),
        );
        doc.init_all(&registry);

        let mut clip = Clipboard::new();
        clip.copy(&doc, &[parent, child]).unwrap();
        let pasted = clip.paste(&mut doc, &registry, 0.0).unwrap();
        assert_eq!(pasted.len(), 1);
        let kids = doc.children(pasted[0]);
        assert_eq!(kids.len(), 1);
        assert_ne!(doc.get(kids[0]).unwrap().id, PenId::intern("clip_c"));
    }

    #[test]
    fn empty_or_garbage_clipboard_fails() {
        let mut doc = TopologyData::new();
        let mut clip = Clipboard::new();
        assert!(clip.paste(&mut doc, &ShapeRegistry::new(), 20.0).is_err());
        clip.set("not json");
        assert!(clip.paste(&mut doc, &ShapeRegistry::new(), 20.0).is_err());
        assert!(doc.is_empty());
    }
}
