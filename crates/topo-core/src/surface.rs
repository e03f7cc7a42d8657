//! The immediate-mode drawing surface pens render onto.
//!
//! Modelled on the HTML canvas 2D context: a current path, a state stack
//! saved and restored around every pen, and CSS color strings. Angles are
//! radians here, as in the canvas API.

use crate::pen::{LineCap, TextAlign, TextBaseline};

pub trait Surface {
    // ─── State ───────────────────────────────────────────────────────────

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f64, y: f64);
    fn rotate(&mut self, radians: f64);
    fn scale(&mut self, x: f64, y: f64);

    // ─── Path construction ───────────────────────────────────────────────

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64);
    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64);
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64);
    fn ellipse(&mut self, x: f64, y: f64, rx: f64, ry: f64);
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn close_path(&mut self);

    // ─── Painting ────────────────────────────────────────────────────────

    fn fill(&mut self);
    fn stroke(&mut self);
    /// Intersect the clip region with the current path.
    fn clip(&mut self);
    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64);

    // ─── Style ───────────────────────────────────────────────────────────

    fn set_stroke_style(&mut self, color: &str);
    fn set_fill_style(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_line_dash(&mut self, pattern: &[f64]);
    fn set_line_dash_offset(&mut self, offset: f64);
    fn set_line_cap(&mut self, cap: LineCap);
    fn set_global_alpha(&mut self, alpha: f64);
    fn set_shadow(&mut self, color: &str, blur: f64, offset_x: f64, offset_y: f64);

    // ─── Text ────────────────────────────────────────────────────────────

    fn set_font(&mut self, css: &str);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);
    fn fill_text(&mut self, text: &str, x: f64, y: f64);
    /// Advance width of `text` in the current font.
    fn measure_text(&mut self, text: &str) -> f64;
}
