pub mod hit;
pub mod paint;
pub mod recording;
pub mod scene;
pub mod shapes;

pub use hit::{LineHit, hit_line, hit_line_control, hit_node, hit_node_anchor, pens_in_rect};
pub use paint::{StateGuard, draw_pen, render_line_travel, render_pen, render_pens};
pub use recording::RecordingSurface;
pub use scene::VelloSurface;
pub use shapes::register_builtin_shapes;
