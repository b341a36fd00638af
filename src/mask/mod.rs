pub mod contour;
pub mod grid;
pub mod outline;
pub mod width;

pub use contour::{extract, Contour};
pub use grid::SegMask;
pub use outline::{Outline, OutlineSource, OutlineTracker};
pub use width::{circumference_cm, row_width, row_width_px};
