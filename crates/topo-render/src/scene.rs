//! [`Surface`] over a `vello::Scene`.
//!
//! Vello has no implicit drawing state, so this keeps a canvas-style
//! state stack (transform, colors, stroke parameters, alpha, clip layers)
//! and a current path in user space. `fill`/`stroke` emit one Vello draw
//! each with the current transform.

use kurbo::{Affine, Arc, BezPath, Cap, Ellipse, Join, PathEl, Point, Rect, Shape, Stroke as KurboStroke, Vec2};
use peniko::{Color, Fill, Mix};
use smallvec::SmallVec;
use topo_core::pen::{LineCap, TextAlign, TextBaseline};
use topo_core::{Surface, parse_css_color};
use vello::Scene;

const TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone)]
struct State {
    transform: Affine,
    stroke: Color,
    fill: Color,
    line_width: f64,
    dash: SmallVec<[f64; 4]>,
    dash_offset: f64,
    cap: Cap,
    alpha: f32,
    font_size: f64,
    /// Clip layers pushed while this state was current.
    clips: u32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            stroke: Color::from_rgba8(0, 0, 0, 255),
            fill: Color::from_rgba8(0, 0, 0, 255),
            line_width: 1.0,
            dash: SmallVec::new(),
            dash_offset: 0.0,
            cap: Cap::Butt,
            alpha: 1.0,
            font_size: 12.0,
            clips: 0,
        }
    }
}

pub struct VelloSurface<'s> {
    scene: &'s mut Scene,
    state: State,
    stack: Vec<State>,
    path: BezPath,
}

impl<'s> VelloSurface<'s> {
    pub fn new(scene: &'s mut Scene) -> Self {
        Self {
            scene,
            state: State::default(),
            stack: Vec::new(),
            path: BezPath::new(),
        }
    }

    fn current_point(&self) -> Option<Point> {
        match self.path.elements().last()? {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(*p),
            PathEl::QuadTo(_, p) => Some(*p),
            PathEl::CurveTo(_, _, p) => Some(*p),
            PathEl::ClosePath => None,
        }
    }

    fn brush(&self, color: Color) -> Color {
        color.multiply_alpha(self.state.alpha)
    }

    fn pop_clips(&mut self, count: u32) {
        for _ in 0..count {
            self.scene.pop_layer();
        }
    }
}

fn to_color(css: &str) -> Option<Color> {
    let Some(c) = parse_css_color(css) else {
        log::warn!("unparsable color {css:?}");
        return None;
    };
    let [r, g, b, a] = c.to_rgba8();
    Some(Color::from_rgba8(r, g, b, a))
}

fn font_size_of(css: &str) -> Option<f64> {
    css.split_whitespace()
        .find_map(|part| part.strip_suffix("px"))
        .and_then(|n| n.parse().ok())
}

impl Surface for VelloSurface<'_> {
    fn save(&mut self) {
        let mut saved = self.state.clone();
        saved.clips = 0;
        self.stack.push(std::mem::replace(&mut self.state, saved));
    }

    fn restore(&mut self) {
        let clips = self.state.clips;
        self.pop_clips(clips);
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => log::warn!("restore without matching save"),
        }
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.state.transform *= Affine::translate((x, y));
    }

    fn rotate(&mut self, radians: f64) {
        self.state.transform *= Affine::rotate(radians);
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.state.transform *= Affine::scale_non_uniform(x, y);
    }

    fn begin_path(&mut self) {
        self.path.truncate(0);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to((x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if self.current_point().is_none() {
            self.path.move_to((x, y));
        } else {
            self.path.line_to((x, y));
        }
    }

    fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        if self.current_point().is_none() {
            self.path.move_to((c1x, c1y));
        }
        self.path.curve_to((c1x, c1y), (c2x, c2y), (x, y));
    }

    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        if self.current_point().is_none() {
            self.path.move_to((cx, cy));
        }
        self.path.quad_to((cx, cy), (x, y));
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64) {
        let center = Point::new(x, y);
        let start_pt = center + Vec2::from_angle(start) * radius;
        if self.current_point().is_some() {
            self.path.line_to(start_pt);
        } else {
            self.path.move_to(start_pt);
        }
        let arc = Arc::new(center, (radius, radius), start, end - start, 0.0);
        arc.to_cubic_beziers(TOLERANCE, |p1, p2, p| self.path.curve_to(p1, p2, p));
    }

    fn ellipse(&mut self, x: f64, y: f64, rx: f64, ry: f64) {
        let e = Ellipse::new((x, y), (rx, ry), 0.0);
        self.path.extend(e.path_elements(TOLERANCE));
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.path
            .extend(Rect::new(x, y, x + w, y + h).path_elements(TOLERANCE));
    }

    fn close_path(&mut self) {
        self.path.close_path();
    }

    fn fill(&mut self) {
        if self.path.is_empty() {
            return;
        }
        let color = self.brush(self.state.fill);
        self.scene
            .fill(Fill::NonZero, self.state.transform, color, None, &self.path);
    }

    fn stroke(&mut self) {
        if self.path.is_empty() || self.state.line_width <= 0.0 {
            return;
        }
        let mut stroke = KurboStroke::new(self.state.line_width)
            .with_caps(self.state.cap)
            .with_join(Join::Round);
        if !self.state.dash.is_empty() {
            stroke = stroke.with_dashes(self.state.dash_offset, self.state.dash.iter().copied());
        }
        let color = self.brush(self.state.stroke);
        self.scene
            .stroke(&stroke, self.state.transform, color, None, &self.path);
    }

    fn clip(&mut self) {
        self.scene
            .push_layer(Mix::Clip, 1.0, self.state.transform, &self.path);
        self.state.clips += 1;
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        // A scene is rebuilt every frame; there is nothing to erase.
        log::trace!("clear_rect({x}, {y}, {w}, {h}) ignored");
    }

    fn set_stroke_style(&mut self, color: &str) {
        if let Some(c) = to_color(color) {
            self.state.stroke = c;
        }
    }

    fn set_fill_style(&mut self, color: &str) {
        if let Some(c) = to_color(color) {
            self.state.fill = c;
        }
    }

    fn set_line_width(&mut self, width: f64) {
        self.state.line_width = width;
    }

    fn set_line_dash(&mut self, pattern: &[f64]) {
        self.state.dash = pattern.iter().copied().collect();
    }

    fn set_line_dash_offset(&mut self, offset: f64) {
        self.state.dash_offset = offset;
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.state.cap = match cap {
            LineCap::Butt => Cap::Butt,
            LineCap::Round => Cap::Round,
            LineCap::Square => Cap::Square,
        };
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.state.alpha = alpha.clamp(0.0, 1.0) as f32;
    }

    fn set_shadow(&mut self, color: &str, blur: f64, _offset_x: f64, _offset_y: f64) {
        log::trace!("shadow {color} blur {blur} not supported by the scene surface");
    }

    fn set_font(&mut self, css: &str) {
        if let Some(size) = font_size_of(css) {
            self.state.font_size = size;
        }
    }

    fn set_text_align(&mut self, _align: TextAlign) {}

    fn set_text_baseline(&mut self, _baseline: TextBaseline) {}

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        // Glyph runs need a font context; the canvas host draws text itself.
        log::trace!("TEXT {text:?} at ({x}, {y})");
    }

    fn measure_text(&mut self, text: &str) -> f64 {
        text.chars().count() as f64 * self.state.font_size * 0.6
    }
}

impl Drop for VelloSurface<'_> {
    fn drop(&mut self) {
        // Balance clip layers left open by unmatched saves.
        let mut open = self.state.clips;
        for s in &self.stack {
            open += s.clips;
        }
        self.pop_clips(open);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_stack_restores_style() {
        let mut scene = Scene::new();
        let mut s = VelloSurface::new(&mut scene);
        s.set_line_width(4.0);
        s.save();
        s.set_line_width(9.0);
        s.translate(10.0, 0.0);
        s.restore();
        assert_eq!(s.state.line_width, 4.0);
        assert_eq!(s.state.transform, Affine::IDENTITY);
    }

    #[test]
    fn font_size_is_read_from_css() {
        assert_eq!(font_size_of("normal bold 14px Arial"), Some(14.0));
        assert_eq!(font_size_of("Arial"), None);
    }
}
