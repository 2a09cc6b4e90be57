use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use ndarray::{Array3, ArrayView2, ArrayView3, Axis, Zip};
use tracing::debug;

use crate::consts::COLOR_CHANNEL_COUNT;
use crate::deconvolution::fast_ring::{fast_ring_sample, FastRingKernels};
use crate::deconvolution::richardson_lucy::{ratio_sample, update_sample};
use crate::error::{DeblurError, Result};
use crate::filters::convolve::{sharpen_sample, window_mean};
use crate::kernel::{KernelOffsetSet, WeightMatrix};

use super::kernels::{disk_blur, fast_ring, richardson_lucy, sharpen};
use super::{AccessMode, BufferHandle, ComputeDevice, ElementType, KernelArg, KernelHandle, KernelKind};

type Buffers = HashMap<u64, Vec<u32>>;

/// Software compute device that keeps "device" memory in host vectors and
/// runs kernels with the same per-pixel routines as the CPU backend.
#[derive(Default)]
pub struct HostDevice {
    buffers: Mutex<Buffers>,
    kernels: Mutex<Vec<KernelKind>>,
    next_id: AtomicU64,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffers(&self) -> Result<MutexGuard<'_, Buffers>> {
        self.buffers
            .lock()
            .map_err(|_| DeblurError::Gpu("host device buffer table poisoned".into()))
    }

    fn kernel_kind(&self, kernel: KernelHandle) -> Result<KernelKind> {
        let kernels = self
            .kernels
            .lock()
            .map_err(|_| DeblurError::Gpu("host device kernel table poisoned".into()))?;
        kernels
            .get(kernel.0 as usize)
            .copied()
            .ok_or_else(|| DeblurError::Gpu(format!("unknown kernel handle {}", kernel.0)))
    }
}

impl ComputeDevice for HostDevice {
    fn name(&self) -> &str {
        "host"
    }

    fn compile(&self, kind: KernelKind) -> Result<KernelHandle> {
        let mut kernels = self
            .kernels
            .lock()
            .map_err(|_| DeblurError::Gpu("host device kernel table poisoned".into()))?;
        kernels.push(kind);
        Ok(KernelHandle(kernels.len() as u32 - 1))
    }

    fn allocate(&self, element: ElementType, len: usize, access: AccessMode) -> Result<BufferHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.buffers()?.insert(id, vec![0; len]);
        debug!(id, %element, len, %access, "Host buffer allocated");
        Ok(BufferHandle(id))
    }

    fn release(&self, buffer: BufferHandle) {
        if let Ok(mut buffers) = self.buffers.lock() {
            buffers.remove(&buffer.0);
        }
    }

    fn upload(&self, buffer: BufferHandle, offset: usize, words: &[u32]) -> Result<()> {
        let mut buffers = self.buffers()?;
        let target = words_mut(&mut buffers, buffer)?;
        let end = offset + words.len();
        if end > target.len() {
            return Err(DeblurError::DeviceBufferRangeOverflow {
                requested: end,
                capacity: target.len(),
            });
        }
        target[offset..end].copy_from_slice(words);
        Ok(())
    }

    fn download(&self, buffer: BufferHandle, offset: usize, out: &mut [u32]) -> Result<()> {
        let buffers = self.buffers()?;
        let source = words(&buffers, buffer)?;
        let end = offset + out.len();
        if end > source.len() {
            return Err(DeblurError::DeviceBufferRangeOverflow {
                requested: end,
                capacity: source.len(),
            });
        }
        out.copy_from_slice(&source[offset..end]);
        Ok(())
    }

    fn copy(
        &self,
        src: BufferHandle,
        src_offset: usize,
        dst: BufferHandle,
        dst_offset: usize,
        len: usize,
    ) -> Result<()> {
        let mut buffers = self.buffers()?;
        let chunk = words(&buffers, src)?
            .get(src_offset..src_offset + len)
            .ok_or(DeblurError::DeviceBufferRangeOverflow {
                requested: src_offset + len,
                capacity: 0,
            })?
            .to_vec();
        let target = words_mut(&mut buffers, dst)?;
        let capacity = target.len();
        target
            .get_mut(dst_offset..dst_offset + len)
            .ok_or(DeblurError::DeviceBufferRangeOverflow {
                requested: dst_offset + len,
                capacity,
            })?
            .copy_from_slice(&chunk);
        Ok(())
    }

    fn dispatch(&self, kernel: KernelHandle, args: &[(u32, KernelArg)], global: (u32, u32)) -> Result<()> {
        let kind = self.kernel_kind(kernel)?;
        let args = Args(args);
        let (w, h) = (global.0 as usize, global.1 as usize);
        let mut buffers = self.buffers()?;

        let (target, output) = match kind {
            KernelKind::FastRing => run_fast_ring(&buffers, &args, w, h)?,
            KernelKind::RichardsonLucy => run_richardson_lucy(&buffers, &args, w, h)?,
            KernelKind::Sharpen => run_sharpen(&buffers, &args, w, h)?,
            KernelKind::DiskBlur => run_disk_blur(&buffers, &args, w, h)?,
        };

        let dst = words_mut(&mut buffers, target)?;
        if output.len() > dst.len() {
            return Err(DeblurError::DeviceBufferRangeOverflow {
                requested: output.len(),
                capacity: dst.len(),
            });
        }
        dst[..output.len()].copy_from_slice(&output);
        Ok(())
    }

    fn live_allocations(&self) -> usize {
        self.buffers.lock().map(|b| b.len()).unwrap_or(0)
    }
}

fn words(buffers: &Buffers, handle: BufferHandle) -> Result<&[u32]> {
    buffers
        .get(&handle.0)
        .map(Vec::as_slice)
        .ok_or_else(|| DeblurError::Gpu(format!("unknown buffer handle {}", handle.0)))
}

fn words_mut(buffers: &mut Buffers, handle: BufferHandle) -> Result<&mut [u32]> {
    buffers
        .get_mut(&handle.0)
        .map(Vec::as_mut_slice)
        .ok_or_else(|| DeblurError::Gpu(format!("unknown buffer handle {}", handle.0)))
}

/// Slot lookup over a dispatch argument list.
struct Args<'a>(&'a [(u32, KernelArg)]);

impl Args<'_> {
    fn get(&self, slot: u32) -> Result<KernelArg> {
        self.0
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, a)| *a)
            .ok_or(DeblurError::UnboundArgument { slot })
    }

    fn buffer(&self, slot: u32) -> Result<BufferHandle> {
        match self.get(slot)? {
            KernelArg::Buffer(b) => Ok(b),
            KernelArg::Scalar(_) => Err(DeblurError::UnboundArgument { slot }),
        }
    }

    fn word(&self, slot: u32) -> Result<u32> {
        match self.get(slot)? {
            KernelArg::Scalar(s) => Ok(s.to_word()),
            KernelArg::Buffer(_) => Err(DeblurError::Gpu(format!("slot {slot} expects a scalar"))),
        }
    }

    fn float(&self, slot: u32) -> Result<f32> {
        self.word(slot).map(f32::from_bits)
    }
}

fn image_view<'a>(buffers: &'a Buffers, handle: BufferHandle, w: usize, h: usize) -> Result<ArrayView3<'a, f32>> {
    let len = COLOR_CHANNEL_COUNT * w * h;
    let data = words(buffers, handle)?;
    let data = data.get(..len).ok_or(DeblurError::DeviceBufferRangeOverflow {
        requested: len,
        capacity: data.len(),
    })?;
    ArrayView3::from_shape((COLOR_CHANNEL_COUNT, w, h), bytemuck::cast_slice::<u32, f32>(data))
        .map_err(|e| DeblurError::Gpu(e.to_string()))
}

fn offsets(buffers: &Buffers, handle: BufferHandle, count: u32) -> Result<KernelOffsetSet> {
    let data = words(buffers, handle)?;
    let len = count as usize * 2;
    let data = data.get(..len).ok_or(DeblurError::DeviceBufferRangeOverflow {
        requested: len,
        capacity: data.len(),
    })?;
    Ok(KernelOffsetSet::from_flat(bytemuck::cast_slice(data)))
}

fn weights(buffers: &Buffers, handle: BufferHandle, size: u32) -> Result<WeightMatrix> {
    let data = words(buffers, handle)?;
    let len = (size * size) as usize;
    let data = data.get(..len).ok_or(DeblurError::DeviceBufferRangeOverflow {
        requested: len,
        capacity: data.len(),
    })?;
    WeightMatrix::from_flat(size as usize, bytemuck::cast_slice(data))
}

fn render<F>(w: usize, h: usize, sample: F) -> Vec<u32>
where
    F: Fn(usize, usize, usize) -> f32 + Sync,
{
    let mut out = Array3::<f32>::zeros((COLOR_CHANNEL_COUNT, w, h));
    Zip::indexed(&mut out).par_for_each(|(c, x, y), v| *v = sample(c, x, y));
    out.iter().map(|v| v.to_bits()).collect()
}

fn planes(image: ArrayView3<'_, f32>) -> Vec<ArrayView2<'_, f32>> {
    (0..COLOR_CHANNEL_COUNT)
        .map(|c| image.index_axis_move(Axis(0), c))
        .collect()
}

fn run_fast_ring(buffers: &Buffers, args: &Args, w: usize, h: usize) -> Result<(BufferHandle, Vec<u32>)> {
    use fast_ring::*;
    let kernels = FastRingKernels {
        inner: offsets(buffers, args.buffer(INNER_RING)?, args.word(INNER_COUNT)?)?,
        outer: offsets(buffers, args.buffer(OUTER_RING)?, args.word(OUTER_COUNT)?)?,
        coarse: offsets(buffers, args.buffer(COARSE_RING)?, args.word(COARSE_COUNT)?)?,
    };
    let multiplier = args.float(INNER_MULTIPLIER)?;
    let original = planes(image_view(buffers, args.buffer(ORIGINAL)?, w, h)?);
    let estimate = planes(image_view(buffers, args.buffer(ESTIMATE)?, w, h)?);
    let out = render(w, h, |c, x, y| {
        fast_ring_sample(&original[c], &estimate[c], &kernels, multiplier, x, y)
    });
    Ok((args.buffer(OUTPUT)?, out))
}

fn run_richardson_lucy(buffers: &Buffers, args: &Args, w: usize, h: usize) -> Result<(BufferHandle, Vec<u32>)> {
    use richardson_lucy::*;
    let disk = weights(buffers, args.buffer(KERNEL)?, args.word(KERNEL_SIZE)?)?;
    let estimate = planes(image_view(buffers, args.buffer(ESTIMATE)?, w, h)?);
    if args.word(MODE)? == MODE_RATIO {
        let observed = planes(image_view(buffers, args.buffer(OBSERVED)?, w, h)?);
        let out = render(w, h, |c, x, y| ratio_sample(&observed[c], &estimate[c], &disk, x, y));
        Ok((args.buffer(RATIO)?, out))
    } else {
        let ratio = planes(image_view(buffers, args.buffer(RATIO)?, w, h)?);
        let out = render(w, h, |c, x, y| update_sample(&estimate[c], &ratio[c], &disk, x, y));
        Ok((args.buffer(ESTIMATE)?, out))
    }
}

fn run_sharpen(buffers: &Buffers, args: &Args, w: usize, h: usize) -> Result<(BufferHandle, Vec<u32>)> {
    use sharpen::*;
    let disk = weights(buffers, args.buffer(KERNEL)?, args.word(KERNEL_SIZE)?)?;
    let blend = args.float(BLEND)?;
    let source = planes(image_view(buffers, args.buffer(SOURCE)?, w, h)?);
    let out = render(w, h, |c, x, y| sharpen_sample(&source[c], &disk, blend, x, y));
    Ok((args.buffer(OUTPUT)?, out))
}

fn run_disk_blur(buffers: &Buffers, args: &Args, w: usize, h: usize) -> Result<(BufferHandle, Vec<u32>)> {
    use disk_blur::*;
    let disk = weights(buffers, args.buffer(KERNEL)?, args.word(KERNEL_SIZE)?)?;
    let source = planes(image_view(buffers, args.buffer(SOURCE)?, w, h)?);
    let out = render(w, h, |c, x, y| window_mean(&source[c], &disk, x, y));
    Ok((args.buffer(OUTPUT)?, out))
}
