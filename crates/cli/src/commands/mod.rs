pub mod analyze;
pub mod render;

pub use analyze::*;
pub use render::*;
