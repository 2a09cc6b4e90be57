use crate::compute::pool::WorkerPool;
use crate::error::Result;
use crate::kernel::{disk_weights, DiskProfile};
use crate::pipeline::types::{JobContext, ProgressSpan};
use crate::raster::Raster;

use super::convolve::window_mean;

/// Mean over a binary disk of `radius`, rim cells included. `Ok(None)` if canceled.
pub fn disk_blur(input: &Raster, radius: f32, pool: &WorkerPool, ctx: &JobContext) -> Result<Option<Raster>> {
    let disk = disk_weights(radius, DiskProfile::BinaryClosed)?;
    let (w, h) = input.dims();
    let mut out = Raster::new(w, h);
    let planes = [input.plane(0), input.plane(1), input.plane(2)];

    let done = pool.sweep(&mut out, ctx, ProgressSpan::FULL, |c, x, y| {
        window_mean(&planes[c], &disk, x, y)
    });
    Ok(done.then_some(out))
}
