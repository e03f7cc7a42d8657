//! Integration tests: document → render pipeline → recorded surface calls.

use pretty_assertions::assert_eq;
use topo_core::{ShapeRegistry, TopologyData};
use topo_render::recording::{Op, RecordingSurface};
use topo_render::{register_builtin_shapes, render_pens};

const DOC: &str = r##"{
    "pens": [
        { "id": "rp_parent", "name": "rectangle", "rect": { "x": 0, "y": 0, "width": 100, "height": 100 },
          "strokeStyle": "#ff0000", "lineWidth": 4, "rotate": 30, "text": "parent",
          "children": [
            { "id": "rp_child", "name": "circle", "rect": { "x": 10, "y": 10, "width": 20, "height": 20 },
              "text": "child" }
          ] },
        { "id": "rp_ghost", "name": "rectangle", "rect": { "x": 0, "y": 0, "width": 10, "height": 10 },
          "text": "ghost", "visible": false },
        { "id": "rp_unknown", "name": "cloud", "rect": { "x": 200, "y": 0, "width": 50, "height": 50 },
          "text": "cloud" },
        { "id": "rp_edge", "name": "line",
          "from": { "x": 100, "y": 50 }, "to": { "x": 300, "y": 50 },
          "toArrow": "triangleSolid", "lineDash": [5, 5] }
    ]
}"##;

fn render() -> RecordingSurface {
    let mut registry = ShapeRegistry::new();
    register_builtin_shapes(&mut registry);
    let doc = TopologyData::from_json(DOC, &registry).unwrap();
    let mut surface = RecordingSurface::new();
    render_pens(&mut surface, &doc, &registry, |_| false);
    surface
}

#[test]
fn every_save_is_restored() {
    let surface = render();
    assert_eq!(surface.depth(), 0);
    assert_eq!(
        surface.count(|op| *op == Op::Save),
        surface.count(|op| *op == Op::Restore)
    );
    // Children draw after their parent's scope closes, never nested in it.
    assert_eq!(surface.max_depth(), 1);
}

#[test]
fn children_draw_after_parent_and_hidden_pens_are_skipped() {
    let surface = render();
    assert_eq!(surface.texts(), vec!["parent", "child", "cloud"]);
}

#[test]
fn rotation_is_scoped_to_its_pen() {
    let surface = render();
    let rotates: Vec<usize> = surface
        .ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, Op::Rotate(_)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(rotates.len(), 1);

    // The rotation sits between the parent's save and its matching restore.
    let first_restore = surface
        .ops
        .iter()
        .position(|op| *op == Op::Restore)
        .unwrap();
    assert!(rotates[0] < first_restore);
}

#[test]
fn every_pen_sets_its_own_style() {
    let surface = render();
    // Each scope opens with a fresh stroke style, so nothing is inherited.
    let mut after_save = false;
    for op in &surface.ops {
        match op {
            Op::Save => after_save = true,
            Op::StrokeStyle(_) if after_save => after_save = false,
            Op::Translate(..) | Op::Rotate(_) => {}
            other if after_save => panic!("{other:?} before the pen's stroke style"),
            _ => {}
        }
    }
}

#[test]
fn arrowheads_are_solid_on_dashed_lines() {
    let surface = render();
    let last_dash = surface
        .ops
        .iter()
        .rev()
        .find_map(|op| match op {
            Op::LineDash(d) => Some(d.clone()),
            _ => None,
        })
        .unwrap();
    assert!(last_dash.is_empty());
    assert!(surface.count(|op| *op == Op::Fill) >= 1);
}
