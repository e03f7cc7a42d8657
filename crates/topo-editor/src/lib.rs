pub mod active;
pub mod animate;
pub mod clipboard;
pub mod compositor;
pub mod docking;
pub mod events;
pub mod history;
pub mod hover;
pub mod input;
pub mod options;
pub mod shortcuts;
pub mod topology;

pub use active::{ActiveLayer, Align};
pub use animate::{AnimateLayer, FrameToken, Trigger};
pub use events::{EventBus, TopologyEvent};
pub use input::{InputEvent, Modifiers};
pub use options::Options;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use topology::Topology;
