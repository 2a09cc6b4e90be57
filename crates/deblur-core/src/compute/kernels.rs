//! Argument slot layouts shared by the device programs, the host device
//! and the WGSL shaders. Buffer slots double as shader binding indices.

/// Binding index of the uniform block holding every scalar argument,
/// packed in slot order.
pub const PARAMS_BINDING: u32 = 16;

pub mod fast_ring {
    pub const OUTPUT: u32 = 0;
    pub const ESTIMATE: u32 = 1;
    pub const ORIGINAL: u32 = 2;
    pub const INNER_RING: u32 = 3;
    pub const OUTER_RING: u32 = 4;
    pub const COARSE_RING: u32 = 5;
    pub const INNER_COUNT: u32 = 6;
    pub const OUTER_COUNT: u32 = 7;
    pub const COARSE_COUNT: u32 = 8;
    pub const RING_RATIO: u32 = 9;
    pub const INNER_MULTIPLIER: u32 = 10;
    pub const WIDTH: u32 = 11;
    pub const HEIGHT: u32 = 12;
}

pub mod richardson_lucy {
    pub const ESTIMATE: u32 = 0;
    pub const RATIO: u32 = 1;
    pub const OBSERVED: u32 = 2;
    pub const KERNEL: u32 = 3;
    pub const KERNEL_SIZE: u32 = 4;
    pub const WIDTH: u32 = 5;
    pub const HEIGHT: u32 = 6;
    /// 0 computes the ratio image, 1 applies the multiplicative update.
    pub const MODE: u32 = 7;

    pub const MODE_RATIO: u32 = 0;
    pub const MODE_UPDATE: u32 = 1;
}

pub mod sharpen {
    pub const OUTPUT: u32 = 0;
    pub const SOURCE: u32 = 1;
    pub const KERNEL: u32 = 2;
    pub const KERNEL_SIZE: u32 = 3;
    pub const WIDTH: u32 = 4;
    pub const HEIGHT: u32 = 5;
    pub const BLEND: u32 = 6;
}

pub mod disk_blur {
    pub const OUTPUT: u32 = 0;
    pub const SOURCE: u32 = 1;
    pub const KERNEL: u32 = 2;
    pub const KERNEL_SIZE: u32 = 3;
    pub const WIDTH: u32 = 4;
    pub const HEIGHT: u32 = 5;
}
