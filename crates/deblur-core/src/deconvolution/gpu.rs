use std::sync::Arc;

use tracing::{debug, info};

use crate::compute::kernels::{disk_blur as blur_slots, fast_ring as fast_slots};
use crate::compute::kernels::{richardson_lucy as rl_slots, sharpen as sharpen_slots};
use crate::compute::{AccessMode, ComputeDevice, HostArray, KernelKind, KernelProgram, Scalar};
use crate::error::{DeblurError, Result};
use crate::filters::sharpen_blend;
use crate::kernel::{disk_weights, DiskProfile};
use crate::pipeline::config::{FastTuning, MethodConfig};
use crate::pipeline::types::JobContext;
use crate::raster::Raster;

use super::fast_ring::{FastRingKernels, FastRingParams};

/// Where a device-side result lives after an operation has been enqueued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceOutput {
    pub kind: KernelKind,
    pub slot: u32,
    pub width: usize,
    pub height: usize,
}

/// Device programs cached for the lifetime of an effect session, one per
/// algorithm. Buffers stay allocated between runs and are reused whenever
/// the new data fits.
#[derive(Default)]
pub struct GpuSession {
    fast: Option<KernelProgram>,
    richardson_lucy: Option<KernelProgram>,
    sharpen: Option<KernelProgram>,
    disk_blur: Option<KernelProgram>,
}

impl GpuSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached program, releasing its device buffers.
    pub fn release(&mut self) {
        let live = self.programs().count();
        self.fast = None;
        self.richardson_lucy = None;
        self.sharpen = None;
        self.disk_blur = None;
        if live > 0 {
            debug!(programs = live, "GPU session released");
        }
    }

    fn programs(&self) -> impl Iterator<Item = &KernelProgram> {
        [&self.fast, &self.richardson_lucy, &self.sharpen, &self.disk_blur]
            .into_iter()
            .flatten()
    }

    /// Number of programs currently cached.
    pub fn live_programs(&self) -> usize {
        self.programs().count()
    }

    pub fn program(&self, kind: KernelKind) -> Option<&KernelProgram> {
        match kind {
            KernelKind::FastRing => self.fast.as_ref(),
            KernelKind::RichardsonLucy => self.richardson_lucy.as_ref(),
            KernelKind::Sharpen => self.sharpen.as_ref(),
            KernelKind::DiskBlur => self.disk_blur.as_ref(),
        }
    }

    fn program_mut(&mut self, device: &Arc<dyn ComputeDevice>, kind: KernelKind) -> Result<&mut KernelProgram> {
        let cached = match kind {
            KernelKind::FastRing => &mut self.fast,
            KernelKind::RichardsonLucy => &mut self.richardson_lucy,
            KernelKind::Sharpen => &mut self.sharpen,
            KernelKind::DiskBlur => &mut self.disk_blur,
        };
        if cached.is_none() {
            *cached = Some(KernelProgram::new(Arc::clone(device), kind)?);
        }
        cached
            .as_mut()
            .ok_or_else(|| DeblurError::Gpu(format!("{kind} program missing")))
    }

    /// Run `method` on the device and leave the result there. `Ok(None)`
    /// if canceled, in which case the whole session has been released.
    pub fn enqueue(
        &mut self,
        device: &Arc<dyn ComputeDevice>,
        method: &MethodConfig,
        input: &Raster,
        tuning: &FastTuning,
        ctx: &JobContext,
    ) -> Result<Option<DeviceOutput>> {
        let (w, h) = input.dims();
        let output = match *method {
            MethodConfig::Fast {
                amount,
                radius,
                iterations,
            } => {
                let params = FastRingParams {
                    inner_scale: tuning.inner_scale,
                    ..FastRingParams::new(amount, radius, iterations)
                };
                self.enqueue_fast(device, input, &params, ctx)?
            }
            MethodConfig::RichardsonLucy { radius, iterations } => {
                self.enqueue_richardson_lucy(device, input, radius, iterations, ctx)?
            }
            MethodConfig::Sharpen { weight, radius } => self.enqueue_sharpen(device, input, weight, radius)?,
            MethodConfig::DiskBlur { radius } => self.enqueue_disk_blur(device, input, radius)?,
            MethodConfig::Wiener { .. } | MethodConfig::Adjust { .. } => {
                return Err(DeblurError::BackendUnavailable(format!("{method} has no device kernel")))
            }
        };

        match output {
            Some((kind, slot)) => Ok(Some(DeviceOutput {
                kind,
                slot,
                width: w,
                height: h,
            })),
            None => {
                info!(%method, "Canceled on device, releasing session");
                self.release();
                Ok(None)
            }
        }
    }

    /// Read an enqueued result back into a raster.
    pub fn download(&mut self, output: &DeviceOutput) -> Result<Raster> {
        let program = match output.kind {
            KernelKind::FastRing => self.fast.as_mut(),
            KernelKind::RichardsonLucy => self.richardson_lucy.as_mut(),
            KernelKind::Sharpen => self.sharpen.as_mut(),
            KernelKind::DiskBlur => self.disk_blur.as_mut(),
        }
        .ok_or_else(|| DeblurError::Gpu(format!("{} program not in session", output.kind)))?;

        program.read_back_slot(output.slot)?;
        let data = program
            .host(output.slot)
            .and_then(HostArray::as_f32)
            .ok_or(DeblurError::UnboundArgument { slot: output.slot })?;
        Raster::from_planar(output.width, output.height, data.to_vec())
    }

    fn enqueue_fast(
        &mut self,
        device: &Arc<dyn ComputeDevice>,
        input: &Raster,
        params: &FastRingParams,
        ctx: &JobContext,
    ) -> Result<Option<(KernelKind, u32)>> {
        use fast_slots::*;
        let kernels = FastRingKernels::new(params.radius)?;
        let (w, h) = input.dims();
        let planar = input.to_planar_vec();
        let iterations = params.iterations.max(1);

        let program = self.program_mut(device, KernelKind::FastRing)?;
        program.set_global_size(w as u32, h as u32);
        program.set_argument(OUTPUT, HostArray::F32(vec![0.0; planar.len()]), AccessMode::WriteOnly)?;
        program.set_argument(ESTIMATE, HostArray::F32(planar.clone()), AccessMode::ReadOnly)?;
        program.set_argument(ORIGINAL, HostArray::F32(planar), AccessMode::ReadOnly)?;
        program.set_argument(INNER_RING, HostArray::I32(kernels.inner.to_flat()), AccessMode::ReadOnly)?;
        program.set_argument(OUTER_RING, HostArray::I32(kernels.outer.to_flat()), AccessMode::ReadOnly)?;
        program.set_argument(COARSE_RING, HostArray::I32(kernels.coarse.to_flat()), AccessMode::ReadOnly)?;
        program.set_scalar(INNER_COUNT, Scalar::U32(kernels.inner.len() as u32));
        program.set_scalar(OUTER_COUNT, Scalar::U32(kernels.outer.len() as u32));
        program.set_scalar(COARSE_COUNT, Scalar::U32(kernels.coarse.len() as u32));
        program.set_scalar(RING_RATIO, Scalar::F32(kernels.ring_ratio()));
        program.set_scalar(INNER_MULTIPLIER, Scalar::F32(params.inner_multiplier()));
        program.set_scalar(WIDTH, Scalar::U32(w as u32));
        program.set_scalar(HEIGHT, Scalar::U32(h as u32));

        for i in 0..iterations {
            if ctx.is_canceled() {
                return Ok(None);
            }
            program.execute_no_readback()?;
            if i + 1 < iterations {
                program.copy_device_to_device(OUTPUT, ESTIMATE)?;
            }
            ctx.report((i + 1) as f64 / iterations as f64);
        }
        Ok((!ctx.is_canceled()).then_some((KernelKind::FastRing, OUTPUT)))
    }

    fn enqueue_richardson_lucy(
        &mut self,
        device: &Arc<dyn ComputeDevice>,
        input: &Raster,
        radius: f32,
        iterations: usize,
        ctx: &JobContext,
    ) -> Result<Option<(KernelKind, u32)>> {
        use rl_slots::*;
        let disk = disk_weights(radius, DiskProfile::Binary)?;
        let (w, h) = input.dims();
        let planar = input.to_planar_vec();

        let program = self.program_mut(device, KernelKind::RichardsonLucy)?;
        program.set_global_size(w as u32, h as u32);
        program.set_argument(ESTIMATE, HostArray::F32(planar.clone()), AccessMode::ReadWrite)?;
        program.set_argument(RATIO, HostArray::F32(vec![0.0; planar.len()]), AccessMode::ReadWrite)?;
        program.set_argument(OBSERVED, HostArray::F32(planar), AccessMode::ReadOnly)?;
        program.set_argument(KERNEL, HostArray::F32(disk.to_flat()), AccessMode::ReadOnly)?;
        program.set_scalar(KERNEL_SIZE, Scalar::U32(disk.size() as u32));
        program.set_scalar(WIDTH, Scalar::U32(w as u32));
        program.set_scalar(HEIGHT, Scalar::U32(h as u32));

        for i in 0..iterations {
            if ctx.is_canceled() {
                return Ok(None);
            }
            program.set_scalar(MODE, Scalar::U32(MODE_RATIO));
            program.execute_no_readback()?;
            program.set_scalar(MODE, Scalar::U32(MODE_UPDATE));
            program.execute_no_readback()?;
            ctx.report((i + 1) as f64 / iterations as f64);
        }
        Ok((!ctx.is_canceled()).then_some((KernelKind::RichardsonLucy, ESTIMATE)))
    }

    fn enqueue_sharpen(
        &mut self,
        device: &Arc<dyn ComputeDevice>,
        input: &Raster,
        weight: f32,
        radius: f32,
    ) -> Result<Option<(KernelKind, u32)>> {
        use sharpen_slots::*;
        let disk = disk_weights(radius, DiskProfile::Graded)?;
        let (w, h) = input.dims();
        let planar = input.to_planar_vec();

        let program = self.program_mut(device, KernelKind::Sharpen)?;
        program.set_global_size(w as u32, h as u32);
        program.set_argument(OUTPUT, HostArray::F32(vec![0.0; planar.len()]), AccessMode::WriteOnly)?;
        program.set_argument(SOURCE, HostArray::F32(planar), AccessMode::ReadOnly)?;
        program.set_argument(KERNEL, HostArray::F32(disk.to_flat()), AccessMode::ReadOnly)?;
        program.set_scalar(KERNEL_SIZE, Scalar::U32(disk.size() as u32));
        program.set_scalar(WIDTH, Scalar::U32(w as u32));
        program.set_scalar(HEIGHT, Scalar::U32(h as u32));
        program.set_scalar(BLEND, Scalar::F32(sharpen_blend(weight, radius)));
        program.execute_no_readback()?;
        Ok(Some((KernelKind::Sharpen, OUTPUT)))
    }

    fn enqueue_disk_blur(
        &mut self,
        device: &Arc<dyn ComputeDevice>,
        input: &Raster,
        radius: f32,
    ) -> Result<Option<(KernelKind, u32)>> {
        use blur_slots::*;
        let disk = disk_weights(radius, DiskProfile::BinaryClosed)?;
        let (w, h) = input.dims();
        let planar = input.to_planar_vec();

        let program = self.program_mut(device, KernelKind::DiskBlur)?;
        program.set_global_size(w as u32, h as u32);
        program.set_argument(OUTPUT, HostArray::F32(vec![0.0; planar.len()]), AccessMode::WriteOnly)?;
        program.set_argument(SOURCE, HostArray::F32(planar), AccessMode::ReadOnly)?;
        program.set_argument(KERNEL, HostArray::F32(disk.to_flat()), AccessMode::ReadOnly)?;
        program.set_scalar(KERNEL_SIZE, Scalar::U32(disk.size() as u32));
        program.set_scalar(WIDTH, Scalar::U32(w as u32));
        program.set_scalar(HEIGHT, Scalar::U32(h as u32));
        program.execute_no_readback()?;
        Ok(Some((KernelKind::DiskBlur, OUTPUT)))
    }
}
