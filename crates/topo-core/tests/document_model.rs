//! Integration tests: JSON document → arena → derived geometry.
//!
//! Exercises the full `topo-core` pipeline: load, child layout cascade,
//! docked connector refresh and tag lookup.

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use topo_core::pen::{EventAction, EventTrigger};
use topo_core::{Direction, PenId, Rect, ShapeRegistry, TopologyData};

fn load() -> (TopologyData, ShapeRegistry) {
    let registry = ShapeRegistry::new();
    let doc = TopologyData::from_json(include_str!("fixtures/flow.json"), &registry).unwrap();
    (doc, registry)
}

fn idx(doc: &TopologyData, id: &str) -> topo_core::PenIndex {
    doc.index_of(PenId::intern(id))
        .unwrap_or_else(|| panic!("#{id} not found"))
}

// ─── Loading ─────────────────────────────────────────────────────────────

#[test]
fn fixture_loads_pens_and_children() {
    let (doc, _) = load();
    assert_eq!(doc.pens.len(), 3);
    assert_eq!(doc.len(), 4);

    let start = idx(&doc, "start");
    let badge = idx(&doc, "badge");
    assert_eq!(doc.children(start), &[badge]);
    assert_eq!(doc.parent(badge), Some(start));

    let edge = doc.get(idx(&doc, "edge")).unwrap();
    assert_eq!(edge.base.events.len(), 1);
    assert_eq!(edge.base.events[0].trigger, EventTrigger::Click);
    assert_eq!(edge.base.events[0].action, EventAction::Link);
}

#[test]
fn percent_paddings_shape_the_content_box() {
    let (doc, _) = load();
    let start = doc.get(idx(&doc, "start")).unwrap().as_node().unwrap();
    assert_eq!(start.padding.left, 10.0);
    assert_eq!(start.text_rect, Rect::new(10.0, 0.0, 80.0, 100.0));
}

// ─── Child layout ────────────────────────────────────────────────────────

#[test]
fn resizing_a_parent_cascades_to_children() {
    let (mut doc, registry) = load();
    let start = idx(&doc, "start");
    let badge = idx(&doc, "badge");
    assert_eq!(
        doc.get(badge).unwrap().as_node().unwrap().rect,
        Rect::new(10.0, 0.0, 40.0, 40.0)
    );

    doc.get_mut(start).unwrap().as_node_mut().unwrap().rect.width = 200.0;
    doc.init_pen(start, &registry);

    // Content box is now 160 wide (10% paddings of 200).
    let rect = doc.get(badge).unwrap().as_node().unwrap().rect;
    assert_eq!(rect, Rect::new(20.0, 0.0, 80.0, 40.0));
}

// ─── Connectors ──────────────────────────────────────────────────────────

#[test]
fn docked_endpoint_tracks_rotated_anchor() {
    let (mut doc, _) = load();
    doc.update_docked_lines(&HashSet::from([PenId::intern("end")]));

    let line = doc.get(idx(&doc, "edge")).unwrap().as_line().unwrap();
    // The top anchor of a node turned 90° faces right.
    assert!((line.to().x - 400.0).abs() < 1e-9);
    assert!((line.to().y - 50.0).abs() < 1e-9);
    assert_eq!(line.to().direction, Direction::Right);
    assert_eq!(line.controls().len(), 2);
}

// ─── Lookup ──────────────────────────────────────────────────────────────

#[test]
fn tags_resolve_in_paint_order() {
    let (doc, _) = load();
    let entry = doc.find_by_tag("entry");
    assert_eq!(entry, vec![idx(&doc, "start"), idx(&doc, "end")]);
    assert!(doc.find_by_tag("missing").is_empty());
}

#[test]
fn document_bounds_cover_every_pen() {
    let (doc, _) = load();
    let b = doc.bounds();
    assert_eq!((b.x, b.y), (0.0, 0.0));
    assert!((b.ey() - 100.0).abs() < 1e-9);
    // The curve's handle past the right-facing anchor widens the box.
    assert!(b.ex() > 400.0);
}
