pub mod animation;
pub mod color;
pub mod document;
pub mod geometry;
pub mod id;
pub mod io;
pub mod layout;
pub mod line;
pub mod node;
pub mod pen;
pub mod registry;
pub mod shapes;
pub mod surface;

pub use animation::{FrameSample, FrameState, Keyframe};
pub use color::{Color, parse_css_color};
pub use document::{Lock, TopologyData};
pub use geometry::{Direction, Point, Rect};
pub use id::PenId;
pub use io::{DocumentFile, PenFile};
pub use line::{Line, LineAnimateType, LineEnd, LineKind};
pub use node::{Anchors, Length, Node, RectInParent};
pub use pen::{Pen, PenBase, PenIndex, PenKind, Style};
pub use registry::ShapeRegistry;
pub use surface::Surface;

// Re-export petgraph's index type so downstream crates don't need a direct dependency
pub use petgraph::stable_graph::NodeIndex;
