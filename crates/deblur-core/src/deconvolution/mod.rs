pub mod fast_ring;
pub mod gpu;
pub mod richardson_lucy;
pub mod wiener;

pub use fast_ring::{fast_ring, FastRingKernels, FastRingParams};
pub use gpu::{DeviceOutput, GpuSession};
pub use richardson_lucy::richardson_lucy;
pub use wiener::{optimal_dft_size, wiener_deconvolve, WienerPadding};
