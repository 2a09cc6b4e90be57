//! Neighbourhood sampling with clamp-to-edge borders, the single-pass
//! filters built on it, and per-pixel tone adjustment.

pub mod adjust;
pub mod convolve;
pub mod disk_blur;
pub mod sharpen;

pub use adjust::{adjust, AdjustParams};
pub use disk_blur::disk_blur;
pub use sharpen::{sharpen, sharpen_blend};
