pub mod colors;
pub mod grid;
pub mod paint;

pub use colors::user_color;
pub use grid::*;
pub use paint::*;
