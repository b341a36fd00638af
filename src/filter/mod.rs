pub mod ema;
pub mod kernel;
pub mod median;
pub mod one_euro;

pub use ema::Ema;
pub use kernel::SmoothingKernel7;
pub use median::MedianBuffer;
pub use one_euro::{LandmarkFilter, OneEuroFilter};
