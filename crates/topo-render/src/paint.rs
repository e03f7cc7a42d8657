//! Pens → drawing-surface calls.
//!
//! Every pen draws inside a [`StateGuard`]: save, rotate about the pen's
//! own center, apply style, run the registered shape function, restore.
//! The restore runs in `Drop`, so no style or transform can leak into the
//! next sibling even when a shape function returns early.

use kurbo::{BezPath, PathEl};
use std::ops::{Deref, DerefMut};
use topo_core::line::LineEnd;
use topo_core::pen::{Style, TextAlign, TextBaseline};
use topo_core::{Line, LineAnimateType, Pen, PenIndex, PenKind, Rect, ShapeRegistry, Surface, TopologyData};

/// Saves surface state on creation and restores it on drop.
pub struct StateGuard<'a> {
    surface: &'a mut dyn Surface,
}

impl<'a> StateGuard<'a> {
    pub fn new(surface: &'a mut dyn Surface) -> Self {
        surface.save();
        Self { surface }
    }
}

impl<'a> Deref for StateGuard<'a> {
    type Target = dyn Surface + 'a;

    fn deref(&self) -> &Self::Target {
        self.surface
    }
}

impl DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.surface
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}

// ─── Document passes ─────────────────────────────────────────────────────

/// Paint every top-level pen (and its children) in z-order, skipping any
/// top-level pen for which `skip` returns true.
pub fn render_pens(
    surface: &mut dyn Surface,
    doc: &TopologyData,
    registry: &ShapeRegistry,
    skip: impl Fn(PenIndex) -> bool,
) {
    for &idx in &doc.pens {
        if !skip(idx) {
            render_pen(surface, doc, idx, registry);
        }
    }
}

/// Paint one pen, then its children (each under its own guard).
pub fn render_pen(surface: &mut dyn Surface, doc: &TopologyData, idx: PenIndex, registry: &ShapeRegistry) {
    let Some(pen) = doc.get(idx) else {
        return;
    };
    if !pen.base.visible {
        return;
    }
    draw_pen(surface, pen, registry);
    for &child in doc.children(idx) {
        render_pen(surface, doc, child, registry);
    }
}

/// Paint a single pen without its children.
pub fn draw_pen(surface: &mut dyn Surface, pen: &Pen, registry: &ShapeRegistry) {
    let mut s = StateGuard::new(surface);
    if pen.is_node() && pen.base.rotate % 360.0 != 0.0 {
        let c = pen.center();
        s.translate(c.x, c.y);
        s.rotate(pen.base.rotate.to_radians());
        s.translate(-c.x, -c.y);
    }
    apply_style(&mut *s, &pen.base.style);
    match &pen.kind {
        PenKind::Node(node) => {
            let Some(fns) = registry.shape(&node.name) else {
                log::trace!("no painter for shape {:?} (#{})", node.name, pen.id);
                draw_text(&mut *s, pen, node.text_rect);
                return;
            };
            s.begin_path();
            (fns.draw)(&mut *s, pen);
            if let Some(fill) = &pen.base.style.fill_style {
                s.set_fill_style(fill);
                s.fill();
            }
            s.stroke();
            if let Some(icon) = &node.icon {
                draw_icon(&mut *s, pen, icon, node.icon_rect, node.icon_size);
            }
            draw_text(&mut *s, pen, node.text_rect);
        }
        PenKind::Line(line) => {
            s.begin_path();
            trace_path(&mut *s, &line.to_bez_path());
            s.stroke();
            draw_arrows(&mut *s, pen, line, registry);
            let c = line.text_center();
            let w = s.measure_text(&pen.base.text);
            let h = pen.base.font.size * pen.base.font.line_height;
            draw_text(&mut *s, pen, Rect::new(c.x - w / 2.0, c.y - h / 2.0, w, h));
        }
    }
}

/// The animated overlay of a travelling line: a single marching dash, or
/// the path trimmed to the travelled distance.
pub fn render_line_travel(surface: &mut dyn Surface, pen: &Pen, line: &Line, length: f64) {
    let mut s = StateGuard::new(surface);
    apply_style(&mut *s, &pen.base.style);
    let color = line
        .animate_color
        .as_deref()
        .unwrap_or(&pen.base.style.stroke_style);
    s.set_stroke_style(color);
    s.begin_path();
    match line.animate_type {
        LineAnimateType::Dash => {
            let dash = line.animate_span * 10.0;
            s.set_line_dash(&[dash, length.max(dash)]);
            s.set_line_dash_offset(dash - line.animate_pos);
            trace_path(&mut *s, &line.to_bez_path());
        }
        LineAnimateType::Grow => {
            s.set_line_dash(&[]);
            trace_path(&mut *s, &line.partial_path(line.animate_pos));
        }
    }
    s.stroke();
}

// ─── Pieces ──────────────────────────────────────────────────────────────

pub fn apply_style(s: &mut dyn Surface, style: &Style) {
    s.set_stroke_style(&style.stroke_style);
    s.set_line_width(style.line_width);
    s.set_line_dash(&style.line_dash);
    s.set_line_dash_offset(style.line_dash_offset);
    s.set_line_cap(style.line_cap);
    s.set_global_alpha(style.global_alpha);
    if let Some(shadow) = &style.shadow {
        s.set_shadow(&shadow.color, shadow.blur, shadow.offset_x, shadow.offset_y);
    }
}

/// Replay a kurbo path as surface path calls.
pub fn trace_path(s: &mut dyn Surface, path: &BezPath) {
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => s.move_to(p.x, p.y),
            PathEl::LineTo(p) => s.line_to(p.x, p.y),
            PathEl::QuadTo(c, p) => s.quadratic_curve_to(c.x, c.y, p.x, p.y),
            PathEl::CurveTo(c1, c2, p) => s.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
            PathEl::ClosePath => s.close_path(),
        }
    }
}

fn draw_arrows(s: &mut dyn Surface, pen: &Pen, line: &Line, registry: &ShapeRegistry) {
    let ends = [
        (LineEnd::From, line.from_arrow.as_deref(), line.from_arrow_size),
        (LineEnd::To, line.to_arrow.as_deref(), line.to_arrow_size),
    ];
    for (end, name, size) in ends {
        let Some(name) = name else {
            continue;
        };
        let Some(arrow) = registry.arrow(name) else {
            log::trace!("unknown arrow {name:?}");
            continue;
        };
        // Arrowheads are drawn solid even on dashed lines.
        s.set_line_dash(&[]);
        arrow(
            s,
            line.arrow_tail(end),
            *line.end(end),
            size + pen.base.style.line_width,
            &pen.base.style.stroke_style,
        );
    }
}

fn draw_icon(s: &mut dyn Surface, pen: &Pen, icon: &str, rect: Rect, size: f64) {
    let size = if size > 0.0 {
        size
    } else {
        rect.width.min(rect.height) * 0.5
    };
    let c = rect.center();
    s.set_font(&format!("normal normal {size}px {}", pen.base.font.family));
    s.set_fill_style(&pen.base.font.color);
    s.set_text_align(TextAlign::Center);
    s.set_text_baseline(TextBaseline::Middle);
    s.fill_text(icon, c.x, c.y);
}

fn draw_text(s: &mut dyn Surface, pen: &Pen, rect: Rect) {
    if pen.base.text.is_empty() {
        return;
    }
    let font = &pen.base.font;
    s.set_font(&font.css());
    let lines = wrap_text(s, &pen.base.text, rect.width, pen.base.text_max_line as usize);
    let line_h = font.size * font.line_height;
    let total = line_h * lines.len() as f64;

    let x = match font.text_align {
        TextAlign::Left => rect.x,
        TextAlign::Center => rect.center().x,
        TextAlign::Right => rect.ex(),
    } + pen.base.text_offset_x;
    let top = match font.text_baseline {
        TextBaseline::Top => rect.y,
        TextBaseline::Middle => rect.center().y - total / 2.0,
        TextBaseline::Bottom => rect.ey() - total,
    } + pen.base.text_offset_y;

    if let Some(bg) = &font.background {
        s.begin_path();
        s.rect(rect.x, top, rect.width, total);
        s.set_fill_style(bg);
        s.fill();
    }
    s.set_fill_style(&font.color);
    s.set_text_align(font.text_align);
    s.set_text_baseline(TextBaseline::Middle);
    for (i, text) in lines.iter().enumerate() {
        s.fill_text(text, x, top + line_h * (i as f64 + 0.5));
    }
}

/// Break `text` into lines no wider than `max_width`: on spaces first,
/// then inside words that are too long alone. With `max_lines > 0`, the
/// last kept line ends in an ellipsis when text was cut.
pub fn wrap_text(s: &mut dyn Surface, text: &str, max_width: f64, max_lines: usize) -> Vec<String> {
    if max_width <= 0.0 {
        return text.split('\n').map(str::to_string).collect();
    }
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if current.is_empty() || s.measure_text(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            }
            while s.measure_text(&current) > max_width {
                let Some(split) = fitting_prefix(s, &current, max_width) else {
                    break;
                };
                let rest = current.split_off(split);
                lines.push(std::mem::replace(&mut current, rest));
            }
        }
        lines.push(current);
    }

    if max_lines > 0 && lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            while !last.is_empty() && s.measure_text(&format!("{last}…")) > max_width {
                last.pop();
            }
            last.push('…');
        }
    }
    lines
}

/// Byte offset of the longest prefix (at least one char) that fits, or
/// `None` when the whole string is a single char.
fn fitting_prefix(s: &mut dyn Surface, text: &str, max_width: f64) -> Option<usize> {
    let mut ends = text.char_indices().map(|(i, c)| i + c.len_utf8());
    let first = ends.next()?;
    if first == text.len() {
        return None;
    }
    let mut best = first;
    for end in ends {
        if end == text.len() || s.measure_text(&text[..end]) > max_width {
            break;
        }
        best = end;
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingSurface;
    use pretty_assertions::assert_eq;

    #[test]
    fn words_wrap_at_width() {
        let mut s = RecordingSurface::new();
        // 6px per char: "hello world" is 66px.
        let lines = wrap_text(&mut s, "hello world again", 40.0, 0);
        assert_eq!(lines, vec!["hello", "world", "again"]);
    }

    #[test]
    fn long_words_break_inside() {
        let mut s = RecordingSurface::new();
        let lines = wrap_text(&mut s, "abcdefghij", 24.0, 0);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn max_lines_adds_ellipsis() {
        let mut s = RecordingSurface::new();
        let lines = wrap_text(&mut s, "one two three four", 30.0, 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with('…'));
        assert!(s.measure_text(&lines[1]) <= 30.0);
    }

    #[test]
    fn guard_restores_on_drop() {
        let mut s = RecordingSurface::new();
        {
            let mut g = StateGuard::new(&mut s);
            g.set_line_width(3.0);
            assert_eq!(g.measure_text("ab"), 12.0);
        }
        assert_eq!(s.depth(), 0);
        assert_eq!(s.ops.first(), Some(&crate::recording::Op::Save));
        assert_eq!(s.ops.last(), Some(&crate::recording::Op::Restore));
    }
}
