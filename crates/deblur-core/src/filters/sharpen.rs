use crate::compute::pool::WorkerPool;
use crate::error::Result;
use crate::kernel::{disk_weights, validate_radius, DiskProfile};
use crate::pipeline::types::{JobContext, ProgressSpan};
use crate::raster::Raster;

use super::convolve::sharpen_sample;

/// Blend factor between the boosted and original sample: `weight / r²`.
pub fn sharpen_blend(weight: f32, radius: f32) -> f32 {
    weight / (radius * radius)
}

/// Graded-disk sharpen. `Ok(None)` if canceled.
pub fn sharpen(
    input: &Raster,
    weight: f32,
    radius: f32,
    pool: &WorkerPool,
    ctx: &JobContext,
) -> Result<Option<Raster>> {
    validate_radius(radius)?;
    let disk = disk_weights(radius, DiskProfile::Graded)?;
    let blend = sharpen_blend(weight, radius);
    let (w, h) = input.dims();
    let mut out = Raster::new(w, h);
    let planes = [input.plane(0), input.plane(1), input.plane(2)];

    let done = pool.sweep(&mut out, ctx, ProgressSpan::FULL, |c, x, y| {
        sharpen_sample(&planes[c], &disk, blend, x, y)
    });
    Ok(done.then_some(out))
}
