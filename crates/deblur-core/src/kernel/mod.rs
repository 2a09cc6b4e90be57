pub mod disk;
pub mod ring;

pub use disk::{disk_weights, DiskProfile, WeightMatrix};
pub use ring::{ring_offsets, ring_offsets_quarter, KernelOffsetSet};

use crate::error::{DeblurError, Result};

/// Reject radii that cannot describe a kernel.
pub fn validate_radius(radius: f32) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(DeblurError::InvalidKernelRadius { radius })
    }
}
