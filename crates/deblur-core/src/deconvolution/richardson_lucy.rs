use ndarray::ArrayView2;

use crate::compute::pool::WorkerPool;
use crate::consts::RL_DENOMINATOR_FLOOR;
use crate::error::Result;
use crate::filters::convolve::window_mean;
use crate::kernel::{disk_weights, DiskProfile, WeightMatrix};
use crate::pipeline::types::{JobContext, ProgressSpan};
use crate::raster::Raster;

/// `observed / max(blur(estimate), floor)` at one pixel.
pub fn ratio_sample(
    observed: &ArrayView2<f32>,
    estimate: &ArrayView2<f32>,
    disk: &WeightMatrix,
    x: usize,
    y: usize,
) -> f32 {
    observed[[x, y]] / window_mean(estimate, disk, x, y).max(RL_DENOMINATOR_FLOOR)
}

/// `estimate * blur(ratio)` at one pixel.
pub fn update_sample(
    estimate: &ArrayView2<f32>,
    ratio: &ArrayView2<f32>,
    disk: &WeightMatrix,
    x: usize,
    y: usize,
) -> f32 {
    estimate[[x, y]] * window_mean(ratio, disk, x, y)
}

/// Richardson-Lucy deconvolution with a binary disk PSF.
///
/// Each iteration is two full sweeps: the ratio image, then the
/// multiplicative update. The disk is symmetric so the adjoint blur is the
/// same window. `Ok(None)` if canceled.
pub fn richardson_lucy(
    observed: &Raster,
    radius: f32,
    iterations: usize,
    pool: &WorkerPool,
    ctx: &JobContext,
) -> Result<Option<Raster>> {
    let disk = disk_weights(radius, DiskProfile::Binary)?;
    if iterations == 0 {
        return Ok(Some(observed.clone()));
    }

    let (w, h) = observed.dims();
    let obs = [observed.plane(0), observed.plane(1), observed.plane(2)];
    let mut estimate = observed.clone();
    let mut ratio = Raster::new(w, h);
    let mut next = Raster::new(w, h);

    for i in 0..iterations {
        let span = ProgressSpan::FULL.part(i, iterations);

        let est = [estimate.plane(0), estimate.plane(1), estimate.plane(2)];
        if !pool.sweep(&mut ratio, ctx, span.part(0, 2), |c, x, y| {
            ratio_sample(&obs[c], &est[c], &disk, x, y)
        }) {
            return Ok(None);
        }

        let rat = [ratio.plane(0), ratio.plane(1), ratio.plane(2)];
        if !pool.sweep(&mut next, ctx, span.part(1, 2), |c, x, y| {
            update_sample(&est[c], &rat[c], &disk, x, y)
        }) {
            return Ok(None);
        }
        std::mem::swap(&mut estimate, &mut next);
    }

    Ok(Some(estimate))
}
