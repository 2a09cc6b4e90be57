use ndarray::ArrayView2;
use tracing::debug;

use crate::compute::pool::WorkerPool;
use crate::consts::FAST_INNER_SCALE;
use crate::error::Result;
use crate::filters::convolve::{ring_mean, ring_sum};
use crate::kernel::{ring_offsets, ring_offsets_quarter, KernelOffsetSet};
use crate::pipeline::types::{JobContext, ProgressSpan};
use crate::raster::Raster;

/// Parameters of the fast ring-gradient method.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FastRingParams {
    pub amount: f32,
    pub radius: f32,
    pub iterations: usize,
    pub inner_scale: f32,
}

impl FastRingParams {
    pub fn new(amount: f32, radius: f32, iterations: usize) -> Self {
        Self {
            amount,
            radius,
            iterations,
            inner_scale: FAST_INNER_SCALE,
        }
    }

    /// Gain applied to the ring gradient.
    pub fn inner_multiplier(&self) -> f32 {
        self.amount / 2.0 * self.inner_scale
    }
}

/// The three rings sampled by every fast-method pixel.
#[derive(Clone, Debug)]
pub struct FastRingKernels {
    /// Circle at the blur radius.
    pub inner: KernelOffsetSet,
    /// Circle one pixel further out.
    pub outer: KernelOffsetSet,
    /// Sparse circle at twice the radius.
    pub coarse: KernelOffsetSet,
}

impl FastRingKernels {
    pub fn new(radius: f32) -> Result<Self> {
        Ok(Self {
            inner: ring_offsets(radius)?,
            outer: ring_offsets(radius + 1.0)?,
            coarse: ring_offsets_quarter(radius * 2.0)?,
        })
    }

    /// `|inner| / |outer|`, equalising the two sums before subtracting.
    pub fn ring_ratio(&self) -> f32 {
        self.inner.len() as f32 / self.outer.len() as f32
    }
}

/// One output sample: scaled inner-minus-outer gradient of the original
/// plus the coarse-ring mean of the current estimate.
pub fn fast_ring_sample(
    original: &ArrayView2<f32>,
    estimate: &ArrayView2<f32>,
    kernels: &FastRingKernels,
    inner_multiplier: f32,
    x: usize,
    y: usize,
) -> f32 {
    let gradient = ring_sum(original, &kernels.inner, x, y)
        - ring_sum(original, &kernels.outer, x, y) * kernels.ring_ratio();
    inner_multiplier * gradient + ring_mean(estimate, &kernels.coarse, x, y)
}

/// Iterative fast deblur on the CPU pool. `Ok(None)` if canceled; zero
/// iterations return the input unchanged.
pub fn fast_ring(
    input: &Raster,
    params: &FastRingParams,
    pool: &WorkerPool,
    ctx: &JobContext,
) -> Result<Option<Raster>> {
    let kernels = FastRingKernels::new(params.radius)?;
    if params.iterations == 0 {
        return Ok(Some(input.clone()));
    }
    debug!(
        inner = kernels.inner.len(),
        outer = kernels.outer.len(),
        coarse = kernels.coarse.len(),
        "Fast ring kernels"
    );

    let multiplier = params.inner_multiplier();
    let (w, h) = input.dims();
    let original = [input.plane(0), input.plane(1), input.plane(2)];
    let mut estimate = input.clone();
    let mut next = Raster::new(w, h);

    for i in 0..params.iterations {
        let span = ProgressSpan::FULL.part(i, params.iterations);
        let current = [estimate.plane(0), estimate.plane(1), estimate.plane(2)];
        let done = pool.sweep(&mut next, ctx, span, |c, x, y| {
            fast_ring_sample(&original[c], &current[c], &kernels, multiplier, x, y)
        });
        if !done {
            return Ok(None);
        }
        std::mem::swap(&mut estimate, &mut next);
    }

    Ok(Some(estimate))
}
