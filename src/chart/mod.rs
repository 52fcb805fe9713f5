pub mod curve;
pub mod render;
pub mod scale;

pub use render::{HoverPanel, Scene, Sparkline};
pub use scale::{ScaleMapper, Viewport};
