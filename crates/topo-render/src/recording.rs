//! A surface that records every call instead of drawing.
//!
//! Used by tests to assert on draw order and state balance, and handy for
//! debugging a pipeline without a GPU.

use topo_core::Surface;
use topo_core::pen::{LineCap, TextAlign, TextBaseline};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Save,
    Restore,
    Translate(f64, f64),
    Rotate(f64),
    Scale(f64, f64),
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    BezierCurveTo(f64, f64, f64, f64, f64, f64),
    QuadraticCurveTo(f64, f64, f64, f64),
    Arc(f64, f64, f64),
    Ellipse(f64, f64, f64, f64),
    Rect(f64, f64, f64, f64),
    ClosePath,
    Fill,
    Stroke,
    Clip,
    ClearRect(f64, f64, f64, f64),
    StrokeStyle(String),
    FillStyle(String),
    LineWidth(f64),
    LineDash(Vec<f64>),
    LineDashOffset(f64),
    LineCap(LineCap),
    GlobalAlpha(f64),
    Shadow(String),
    Font(String),
    TextAlign(TextAlign),
    TextBaseline(TextBaseline),
    FillText(String, f64, f64),
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<Op>,
    /// Width of one character, used by `measure_text`.
    pub char_width: f64,
    depth: i32,
    max_depth: i32,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            char_width: 6.0,
            ..Self::default()
        }
    }

    /// Current save depth. Zero when every save was restored.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    /// All text drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::FillText(t, _, _) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn save(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.ops.push(Op::Save);
    }

    fn restore(&mut self) {
        self.depth -= 1;
        self.ops.push(Op::Restore);
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.ops.push(Op::Translate(x, y));
    }

    fn rotate(&mut self, radians: f64) {
        self.ops.push(Op::Rotate(radians));
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.ops.push(Op::Scale(x, y));
    }

    fn begin_path(&mut self) {
        self.ops.push(Op::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(Op::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(Op::LineTo(x, y));
    }

    fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.ops.push(Op::BezierCurveTo(c1x, c1y, c2x, c2y, x, y));
    }

    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.ops.push(Op::QuadraticCurveTo(cx, cy, x, y));
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, _start: f64, _end: f64) {
        self.ops.push(Op::Arc(x, y, radius));
    }

    fn ellipse(&mut self, x: f64, y: f64, rx: f64, ry: f64) {
        self.ops.push(Op::Ellipse(x, y, rx, ry));
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push(Op::Rect(x, y, w, h));
    }

    fn close_path(&mut self) {
        self.ops.push(Op::ClosePath);
    }

    fn fill(&mut self) {
        self.ops.push(Op::Fill);
    }

    fn stroke(&mut self) {
        self.ops.push(Op::Stroke);
    }

    fn clip(&mut self) {
        self.ops.push(Op::Clip);
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push(Op::ClearRect(x, y, w, h));
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.ops.push(Op::StrokeStyle(color.to_string()));
    }

    fn set_fill_style(&mut self, color: &str) {
        self.ops.push(Op::FillStyle(color.to_string()));
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(Op::LineWidth(width));
    }

    fn set_line_dash(&mut self, pattern: &[f64]) {
        self.ops.push(Op::LineDash(pattern.to_vec()));
    }

    fn set_line_dash_offset(&mut self, offset: f64) {
        self.ops.push(Op::LineDashOffset(offset));
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.ops.push(Op::LineCap(cap));
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ops.push(Op::GlobalAlpha(alpha));
    }

    fn set_shadow(&mut self, color: &str, _blur: f64, _offset_x: f64, _offset_y: f64) {
        self.ops.push(Op::Shadow(color.to_string()));
    }

    fn set_font(&mut self, css: &str) {
        self.ops.push(Op::Font(css.to_string()));
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.ops.push(Op::TextAlign(align));
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.ops.push(Op::TextBaseline(baseline));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.ops.push(Op::FillText(text.to_string(), x, y));
    }

    fn measure_text(&mut self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }
}
