//! Parent-relative placement of child nodes.
//!
//! A child stores its rect as fractions of the parent's padded content box
//! plus fixed margins ([`RectInParent`]). Placing a child rotates the
//! resulting rect about the parent's center by the parent's rotation, so
//! resizing or rotating a parent cascades deterministically.

use crate::document::TopologyData;
use crate::geometry::{Point, Rect};
use crate::node::{Length, Node, Padding, RectInParent};
use crate::pen::PenIndex;
use crate::registry::ShapeRegistry;

/// The parent geometry children are placed against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentFrame {
    pub rect: Rect,
    pub padding: Padding,
    pub rotate: f64,
}

impl ParentFrame {
    pub fn of(node: &Node, rotate: f64) -> Self {
        Self {
            rect: node.rect,
            padding: node.padding,
            rotate,
        }
    }

    fn content_box(&self) -> Rect {
        Rect::new(
            self.rect.x + self.padding.left,
            self.rect.y + self.padding.top,
            (self.rect.width - self.padding.left - self.padding.right).max(0.0),
            (self.rect.height - self.padding.top - self.padding.bottom).max(0.0),
        )
    }
}

/// World rect and rotation of a child placed by `rip`.
pub fn place_child(parent: &ParentFrame, rip: &RectInParent) -> (Rect, f64) {
    let b = parent.content_box();
    let mut rect = Rect::new(
        b.x + rip.x.resolve(b.width) + rip.margin_left,
        b.y + rip.y.resolve(b.height) + rip.margin_top,
        (rip.width.resolve(b.width) - rip.margin_left - rip.margin_right).max(0.0),
        (rip.height.resolve(b.height) - rip.margin_top - rip.margin_bottom).max(0.0),
    );
    let mut center = rect.center();
    center.rotate(parent.rotate, parent.rect.center());
    rect.set_center(center);
    (rect, parent.rotate + rip.rotate)
}

/// Inverse of [`place_child`]: fractional placement of a child currently
/// at `rect`/`rotate`, keeping the margins of `previous`.
pub fn derive_rect_in_parent(
    parent: &ParentFrame,
    rect: Rect,
    rotate: f64,
    previous: Option<&RectInParent>,
) -> RectInParent {
    let b = parent.content_box();
    let (ml, mt, mr, mb) = previous.map_or((0.0, 0.0, 0.0, 0.0), |p| {
        (p.margin_left, p.margin_top, p.margin_right, p.margin_bottom)
    });

    let mut local = rect;
    let mut center: Point = rect.center();
    center.rotate(-parent.rotate, parent.rect.center());
    local.set_center(center);

    RectInParent {
        x: Length::percent_of(local.x - ml - b.x, b.width),
        y: Length::percent_of(local.y - mt - b.y, b.height),
        width: Length::percent_of(local.width + ml + mr, b.width),
        height: Length::percent_of(local.height + mt + mb, b.height),
        margin_top: mt,
        margin_right: mr,
        margin_bottom: mb,
        margin_left: ml,
        rotate: rotate - parent.rotate,
    }
}

impl TopologyData {
    fn parent_frame(&self, idx: PenIndex) -> Option<ParentFrame> {
        let pen = self.get(idx)?;
        pen.as_node().map(|n| ParentFrame::of(n, pen.base.rotate))
    }

    /// Re-place the children of `parent` (recursively) from their stored
    /// fractional rects. Children without one get it derived from their
    /// current rect first.
    pub fn calc_child_rect(&mut self, parent: PenIndex, registry: &ShapeRegistry) {
        let Some(frame) = self.parent_frame(parent) else {
            return;
        };
        for child in self.children(parent).to_vec() {
            let Some(pen) = self.get_mut(child) else {
                continue;
            };
            let rotate = pen.base.rotate;
            let Some(node) = pen.as_node_mut() else {
                continue;
            };
            match node.rect_in_parent.clone() {
                Some(rip) => {
                    let (rect, rotate) = place_child(&frame, &rip);
                    node.rect = rect;
                    pen.base.rotate = rotate;
                }
                None => {
                    node.rect_in_parent = Some(derive_rect_in_parent(&frame, node.rect, rotate, None));
                }
            }
            pen.init(registry);
            self.calc_child_rect(child, registry);
        }
    }

    /// Re-derive a child's fractional rect after its absolute rect was
    /// edited directly.
    pub fn calc_rect_in_parent(&mut self, child: PenIndex) {
        let Some(frame) = self.parent(child).and_then(|p| self.parent_frame(p)) else {
            return;
        };
        let Some(pen) = self.get_mut(child) else {
            return;
        };
        let rotate = pen.base.rotate;
        if let Some(node) = pen.as_node_mut() {
            let rip = derive_rect_in_parent(&frame, node.rect, rotate, node.rect_in_parent.as_ref());
            node.rect_in_parent = Some(rip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(rotate: f64) -> ParentFrame {
        ParentFrame {
            rect: Rect::new(0.0, 0.0, 200.0, 100.0),
            padding: Padding {
                top: 10.0,
                right: 10.0,
                bottom: 10.0,
                left: 10.0,
            },
            rotate,
        }
    }

    fn close(a: Rect, b: Rect) -> bool {
        (a.x - b.x).abs() < 1e-9
            && (a.y - b.y).abs() < 1e-9
            && (a.width - b.width).abs() < 1e-9
            && (a.height - b.height).abs() < 1e-9
    }

    #[test]
    fn percentages_resolve_in_content_box() {
        let rip = RectInParent {
            x: Length::Percent(50.0),
            y: Length::Px(0.0),
            width: Length::Percent(50.0),
            height: Length::Percent(100.0),
            ..RectInParent::default()
        };
        let (rect, rotate) = place_child(&frame(0.0), &rip);
        assert_eq!(rect, Rect::new(100.0, 10.0, 90.0, 80.0));
        assert_eq!(rotate, 0.0);
    }

    #[test]
    fn parent_rotation_swings_child_center() {
        let rip = RectInParent {
            x: Length::Percent(0.0),
            y: Length::Percent(0.0),
            width: Length::Percent(50.0),
            height: Length::Percent(100.0),
            rotate: 15.0,
            ..RectInParent::default()
        };
        let (rect, rotate) = place_child(&frame(180.0), &rip);
        // Left half flips to the right half when the parent turns over.
        assert!(close(rect, Rect::new(100.0, 10.0, 90.0, 80.0)), "{rect:?}");
        assert_eq!(rotate, 195.0);
    }

    #[test]
    fn derive_inverts_place() {
        let rip = RectInParent {
            x: Length::Percent(25.0),
            y: Length::Percent(10.0),
            width: Length::Percent(40.0),
            height: Length::Percent(50.0),
            margin_left: 2.0,
            margin_top: 3.0,
            rotate: 30.0,
            ..RectInParent::default()
        };
        let f = frame(40.0);
        let (rect, rotate) = place_child(&f, &rip);
        let back = derive_rect_in_parent(&f, rect, rotate, Some(&rip));
        let (again, rotate_again) = place_child(&f, &back);
        assert!(close(rect, again), "{rect:?} vs {again:?}");
        assert!((rotate - rotate_again).abs() < 1e-9);
    }

    #[test]
    fn zero_size_parent_contributes_nothing() {
        let f = ParentFrame {
            rect: Rect::new(5.0, 5.0, 0.0, 0.0),
            padding: Padding::default(),
            rotate: 0.0,
        };
        let rip = derive_rect_in_parent(&f, Rect::new(5.0, 5.0, 10.0, 10.0), 0.0, None);
        assert_eq!(rip.x, Length::Percent(0.0));
        assert_eq!(rip.width, Length::Percent(0.0));
    }
}
