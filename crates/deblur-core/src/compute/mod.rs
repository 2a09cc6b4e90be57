pub mod dft;
pub mod host;
pub mod kernels;
pub mod pool;
pub mod program;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

pub use host::HostDevice;
pub use program::{KernelProgram, TransferStats};

/// How a kernel uses a bound buffer. Decides which transfers happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Uploaded on bind, never read back.
    ReadOnly,
    /// Never uploaded, read back after execution.
    WriteOnly,
    /// Uploaded on bind and read back after execution.
    ReadWrite,
}

impl AccessMode {
    pub fn reads(self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::ReadOnly => write!(f, "read-only"),
            AccessMode::WriteOnly => write!(f, "write-only"),
            AccessMode::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Element type of a device buffer. All types are one 32-bit word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    I32,
    U32,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::F32 => write!(f, "f32"),
            ElementType::I32 => write!(f, "i32"),
            ElementType::U32 => write!(f, "u32"),
        }
    }
}

/// Half-open element range `[start, end)` of a host array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferRange {
    pub start: usize,
    pub end: usize,
}

impl BufferRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Host-side storage mirrored by a device buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum HostArray {
    F32(Vec<f32>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

impl HostArray {
    pub fn element_type(&self) -> ElementType {
        match self {
            HostArray::F32(_) => ElementType::F32,
            HostArray::I32(_) => ElementType::I32,
            HostArray::U32(_) => ElementType::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HostArray::F32(v) => v.len(),
            HostArray::I32(v) => v.len(),
            HostArray::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw 32-bit words, as transferred to the device.
    pub fn words(&self) -> &[u32] {
        match self {
            HostArray::F32(v) => bytemuck::cast_slice(v),
            HostArray::I32(v) => bytemuck::cast_slice(v),
            HostArray::U32(v) => v,
        }
    }

    pub fn words_mut(&mut self) -> &mut [u32] {
        match self {
            HostArray::F32(v) => bytemuck::cast_slice_mut(v),
            HostArray::I32(v) => bytemuck::cast_slice_mut(v),
            HostArray::U32(v) => v,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            HostArray::F32(v) => Some(v),
            _ => None,
        }
    }
}

/// A by-value kernel argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    F32(f32),
    I32(i32),
    U32(u32),
}

impl Scalar {
    pub fn to_word(self) -> u32 {
        match self {
            Scalar::F32(v) => v.to_bits(),
            Scalar::I32(v) => v as u32,
            Scalar::U32(v) => v,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KernelHandle(pub u32);

/// Device programs known to every compute device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelKind {
    FastRing,
    RichardsonLucy,
    Sharpen,
    DiskBlur,
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelKind::FastRing => write!(f, "fast_ring"),
            KernelKind::RichardsonLucy => write!(f, "richardson_lucy"),
            KernelKind::Sharpen => write!(f, "sharpen"),
            KernelKind::DiskBlur => write!(f, "disk_blur"),
        }
    }
}

/// Argument passed to a dispatch, keyed by slot index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KernelArg {
    Scalar(Scalar),
    Buffer(BufferHandle),
}

/// Raw device operations. Offsets and lengths are in 32-bit words.
///
/// `dispatch` blocks until the kernel has finished.
pub trait ComputeDevice: Send + Sync {
    fn name(&self) -> &str;

    fn compile(&self, kind: KernelKind) -> Result<KernelHandle>;

    fn allocate(&self, element: ElementType, len: usize, access: AccessMode) -> Result<BufferHandle>;

    fn release(&self, buffer: BufferHandle);

    fn upload(&self, buffer: BufferHandle, offset: usize, words: &[u32]) -> Result<()>;

    fn download(&self, buffer: BufferHandle, offset: usize, out: &mut [u32]) -> Result<()>;

    fn copy(
        &self,
        src: BufferHandle,
        src_offset: usize,
        dst: BufferHandle,
        dst_offset: usize,
        len: usize,
    ) -> Result<()>;

    /// Run `kernel` over a `global` (width, height) grid. `args` are sorted
    /// by slot.
    fn dispatch(&self, kernel: KernelHandle, args: &[(u32, KernelArg)], global: (u32, u32)) -> Result<()>;

    /// Buffers allocated and not yet released.
    fn live_allocations(&self) -> usize;
}

/// Which device to run on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePreference {
    /// GPU compute if available, otherwise CPU.
    #[default]
    Auto,
    Cpu,
    GpuCompute,
    /// GPU compute with results left on the device for display.
    GpuRaster,
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePreference::Auto => write!(f, "Auto"),
            DevicePreference::Cpu => write!(f, "CPU"),
            DevicePreference::GpuCompute => write!(f, "GPU compute"),
            DevicePreference::GpuRaster => write!(f, "GPU raster"),
        }
    }
}

/// Selected execution backend.
#[derive(Clone)]
pub enum Backend {
    Cpu,
    GpuCompute(Arc<dyn ComputeDevice>),
    GpuRaster(Arc<dyn ComputeDevice>),
}

impl Backend {
    pub fn device(&self) -> Option<&Arc<dyn ComputeDevice>> {
        match self {
            Backend::Cpu => None,
            Backend::GpuCompute(d) | Backend::GpuRaster(d) => Some(d),
        }
    }

    pub fn is_cpu(&self) -> bool {
        matches!(self, Backend::Cpu)
    }

    pub fn name(&self) -> String {
        match self {
            Backend::Cpu => "CPU/Rayon".to_string(),
            Backend::GpuCompute(d) => format!("GPU compute ({})", d.name()),
            Backend::GpuRaster(d) => format!("GPU raster ({})", d.name()),
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Create a backend for the given preference. `Auto` falls back to the CPU
/// when no GPU can be initialised.
pub fn create_backend(preference: &DevicePreference) -> Result<Backend> {
    let backend = match preference {
        DevicePreference::Cpu => Backend::Cpu,
        DevicePreference::GpuCompute => Backend::GpuCompute(gpu_device()?),
        DevicePreference::GpuRaster => Backend::GpuRaster(gpu_device()?),
        DevicePreference::Auto => match gpu_device() {
            Ok(device) => Backend::GpuCompute(device),
            Err(e) => {
                warn!("GPU unavailable ({e}), falling back to CPU");
                Backend::Cpu
            }
        },
    };
    info!(backend = %backend.name(), "Backend selected");
    Ok(backend)
}

#[cfg(feature = "gpu")]
fn gpu_device() -> Result<Arc<dyn ComputeDevice>> {
    let device = wgpu_backend::WgpuDevice::new()?;
    Ok(Arc::new(device))
}

#[cfg(not(feature = "gpu"))]
fn gpu_device() -> Result<Arc<dyn ComputeDevice>> {
    Err(crate::error::DeblurError::BackendUnavailable(
        "built without the `gpu` feature".into(),
    ))
}
