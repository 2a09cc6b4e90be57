use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::compute::dft::{Dft, RustFftDft};
use crate::compute::pool::WorkerPool;
use crate::compute::{create_backend, Backend, KernelProgram};
use crate::deconvolution::fast_ring::{fast_ring, FastRingParams};
use crate::deconvolution::gpu::{DeviceOutput, GpuSession};
use crate::deconvolution::richardson_lucy::richardson_lucy;
use crate::deconvolution::wiener::wiener_deconvolve;
use crate::error::{DeblurError, Result};
use crate::filters::{adjust, disk_blur, sharpen, AdjustParams};
use crate::kernel::validate_radius;
use crate::raster::Raster;

use super::config::{DeblurConfig, FastTuning, MethodConfig};
use super::types::JobContext;

/// A finished result handed to a display collaborator.
pub enum PreviewFrame<'a> {
    Host(&'a Raster),
    /// Result still on the device, in `program`'s `slot`.
    Device {
        program: &'a KernelProgram,
        slot: u32,
        width: usize,
        height: usize,
    },
}

pub trait PreviewSink {
    fn present(&mut self, frame: PreviewFrame<'_>) -> Result<()>;
}

/// Routes each operation to the selected backend and owns the per-session
/// GPU resources.
pub struct Dispatcher {
    backend: Backend,
    pool: WorkerPool,
    dft: Arc<dyn Dft>,
    tuning: FastTuning,
    session: GpuSession,
}

impl Dispatcher {
    pub fn new(backend: Backend, threads: usize) -> Result<Self> {
        Ok(Self {
            backend,
            pool: WorkerPool::new(threads)?,
            dft: Arc::new(RustFftDft),
            tuning: FastTuning::default(),
            session: GpuSession::new(),
        })
    }

    pub fn from_config(config: &DeblurConfig) -> Result<Self> {
        let backend = create_backend(&config.device)?;
        Ok(Self::new(backend, config.threads)?.with_tuning(config.tuning))
    }

    pub fn with_tuning(mut self, tuning: FastTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_dft(mut self, dft: Arc<dyn Dft>) -> Self {
        self.dft = dft;
        self
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    pub fn session(&self) -> &GpuSession {
        &self.session
    }

    /// Switch backends, releasing every device resource of the old one.
    pub fn set_backend(&mut self, backend: Backend) {
        self.session.release();
        info!(from = %self.backend.name(), to = %backend.name(), "Backend switched");
        self.backend = backend;
    }

    /// End the effect session: release cached device programs.
    pub fn end_session(&mut self) {
        self.session.release();
    }

    /// Run `method` on `input`. `Ok(None)` if the job was canceled; the
    /// caller's previous result should then stay in place.
    pub fn run(&mut self, method: &MethodConfig, input: &Raster, ctx: &JobContext) -> Result<Option<Raster>> {
        let start = self.begin(method, input, ctx)?;
        let result = if method.is_identity() {
            Ok(Some(input.clone()))
        } else {
            match self.backend.device().cloned() {
                Some(device) if method.has_device_kernel() => {
                    match self.session.enqueue(&device, method, input, &self.tuning, ctx) {
                        Ok(Some(output)) => self.session.download(&output).map(Some),
                        other => other.map(|_| None),
                    }
                }
                _ => self.run_cpu(method, input, ctx),
            }
        };
        self.finish(method, start, ctx, result)
    }

    /// Like [`run`](Self::run), but presents the result to `sink` instead
    /// of returning it. On the GPU-raster backend the result is presented
    /// straight from device memory. Returns `false` if canceled.
    pub fn preview(
        &mut self,
        method: &MethodConfig,
        input: &Raster,
        ctx: &JobContext,
        sink: &mut dyn PreviewSink,
    ) -> Result<bool> {
        let resident = match &self.backend {
            Backend::GpuRaster(device) if !method.is_identity() && method.has_device_kernel() => {
                Some(Arc::clone(device))
            }
            _ => None,
        };
        let Some(device) = resident else {
            return match self.run(method, input, ctx)? {
                Some(raster) => sink.present(PreviewFrame::Host(&raster)).map(|_| true),
                None => Ok(false),
            };
        };

        let start = self.begin(method, input, ctx)?;
        let enqueued = self.session.enqueue(&device, method, input, &self.tuning, ctx);
        let Some(output) = self.finish(method, start, ctx, enqueued)? else {
            return Ok(false);
        };
        self.present_device(&output, sink)?;
        Ok(true)
    }

    fn present_device(&self, output: &DeviceOutput, sink: &mut dyn PreviewSink) -> Result<()> {
        let program = self
            .session
            .program(output.kind)
            .ok_or_else(|| DeblurError::Gpu(format!("{} program not in session", output.kind)))?;
        sink.present(PreviewFrame::Device {
            program,
            slot: output.slot,
            width: output.width,
            height: output.height,
        })
    }

    fn begin(&self, method: &MethodConfig, input: &Raster, ctx: &JobContext) -> Result<Instant> {
        let (w, h) = input.dims();
        if w == 0 || h == 0 {
            return Err(DeblurError::InvalidDimensions { width: w, height: h });
        }
        if let Some(radius) = method.radius() {
            validate_radius(radius)?;
        }
        ctx.set_label(method.label());
        info!(%method, backend = %self.backend.name(), width = w, height = h, "Starting");
        Ok(Instant::now())
    }

    fn finish<T>(
        &mut self,
        method: &MethodConfig,
        start: Instant,
        ctx: &JobContext,
        result: Result<Option<T>>,
    ) -> Result<Option<T>> {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(Some(_)) => {
                ctx.report(1.0);
                ctx.set_label(&format!("{} ({elapsed_ms}ms)", method.label()));
                info!(%method, elapsed_ms, "Finished");
            }
            Ok(None) => info!(%method, elapsed_ms, "Canceled"),
            Err(e) => {
                warn!(%method, error = %e, "Failed, releasing device session");
                self.session.release();
            }
        }
        result
    }

    fn run_cpu(&self, method: &MethodConfig, input: &Raster, ctx: &JobContext) -> Result<Option<Raster>> {
        let pool = &self.pool;
        match *method {
            MethodConfig::Fast {
                amount,
                radius,
                iterations,
            } => {
                let params = FastRingParams {
                    inner_scale: self.tuning.inner_scale,
                    ..FastRingParams::new(amount, radius, iterations)
                };
                fast_ring(input, &params, pool, ctx)
            }
            MethodConfig::RichardsonLucy { radius, iterations } => {
                richardson_lucy(input, radius, iterations, pool, ctx)
            }
            MethodConfig::Wiener { radius, snr } => wiener_deconvolve(input, radius, snr, self.dft.as_ref(), pool, ctx),
            MethodConfig::Sharpen { weight, radius } => sharpen(input, weight, radius, pool, ctx),
            MethodConfig::DiskBlur { radius } => disk_blur(input, radius, pool, ctx),
            MethodConfig::Adjust {
                contrast,
                brightness,
                saturation,
                exposure,
            } => {
                let params = AdjustParams {
                    contrast,
                    brightness,
                    saturation,
                    exposure,
                };
                adjust(input, &params, pool, ctx)
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.session.release();
    }
}
