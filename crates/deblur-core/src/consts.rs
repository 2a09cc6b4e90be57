/// Number of colour planes in a raster (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Empirical scale applied to `amount / 2` for the fast method's inner ring.
/// Exposed as `FastTuning::inner_scale` so it can be overridden.
pub const FAST_INNER_SCALE: f32 = 0.67;

/// Lower bound on the re-blurred estimate in a Richardson-Lucy ratio pass.
pub const RL_DENOMINATOR_FLOOR: f32 = 0.01;

/// Slope of the graded (sharpen) disk profile before clipping to [0, 1].
pub const SHARPEN_EDGE_SLOPE: f32 = 1.6;

/// Radii below this round to a zero-radius circle and use the minimal ring.
pub const MINIMAL_RING_RADIUS: f32 = 0.5;

/// Multiplier on `sqrt(snr) * radius` for the Wiener anti-ringing border.
pub const WIENER_BORDER_SCALE: f64 = 1.1;

/// Constant extra border (pixels) added around every Wiener input.
pub const WIENER_BORDER_MIN: f64 = 5.0;

/// Contrast slider step: the gain is `ADJUST_CONTRAST_BASE ^ contrast`.
pub const ADJUST_CONTRAST_BASE: f32 = 1.03;

/// Grey level that contrast scales around.
pub const ADJUST_MIDPOINT: f32 = 127.0;

/// Input level mapped to 255 by the exposure curve.
pub const EXPOSURE_KNEE: f32 = 260.0;

/// Exposure-curve exponent per stop: `2 ^ ((exposure - 1) * slope)`.
pub const EXPOSURE_GAMMA_SLOPE: f32 = 0.3;

/// Stops of highlight compression above the knee when exposure is not
/// positive.
pub const EXPOSURE_FALLBACK_STOPS: f32 = 20.0;

/// Report progress every this many columns on the CPU path.
pub const PROGRESS_COLUMN_INTERVAL: usize = 32;

/// Minimum pixel count (h*w) to run per-row DFT passes in parallel.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Workgroup edge length used by every 2-D compute shader.
pub const GPU_WORKGROUP_SIZE: u32 = 16;
