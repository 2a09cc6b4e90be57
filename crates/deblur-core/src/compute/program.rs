use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{DeblurError, Result};

use super::{
    AccessMode, BufferHandle, BufferRange, ComputeDevice, ElementType, HostArray, KernelArg,
    KernelHandle, KernelKind, Scalar,
};

/// Transfer counters for one program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub allocations: usize,
    pub uploads: usize,
    pub downloads: usize,
    pub device_copies: usize,
    pub dispatches: usize,
}

/// A device buffer bound to an argument slot, with the host array it
/// mirrors. Device element 0 corresponds to host element `range.start`.
#[derive(Debug)]
pub struct DeviceBuffer {
    handle: BufferHandle,
    access: AccessMode,
    capacity: usize,
    range: BufferRange,
    host: HostArray,
}

impl DeviceBuffer {
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn element_type(&self) -> ElementType {
        self.host.element_type()
    }

    /// Elements the device allocation can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn range(&self) -> BufferRange {
        self.range
    }

    pub fn host(&self) -> &HostArray {
        &self.host
    }
}

#[derive(Debug)]
enum ArgumentSlot {
    Scalar(Scalar),
    Buffer(DeviceBuffer),
}

/// One compiled device kernel plus its bound arguments.
///
/// Buffers are cached per slot: rebinding a slot with data that fits the
/// existing allocation reuses it, larger data reallocates. Every buffer is
/// released when the program is released or dropped.
pub struct KernelProgram {
    device: Arc<dyn ComputeDevice>,
    kind: KernelKind,
    kernel: KernelHandle,
    global_size: (u32, u32),
    slots: BTreeMap<u32, ArgumentSlot>,
    stats: TransferStats,
}

impl KernelProgram {
    pub fn new(device: Arc<dyn ComputeDevice>, kind: KernelKind) -> Result<Self> {
        let kernel = device.compile(kind)?;
        debug!(%kind, device = device.name(), "Kernel compiled");
        Ok(Self {
            device,
            kind,
            kernel,
            global_size: (0, 0),
            slots: BTreeMap::new(),
            stats: TransferStats::default(),
        })
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn device(&self) -> &Arc<dyn ComputeDevice> {
        &self.device
    }

    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    pub fn set_global_size(&mut self, width: u32, height: u32) {
        self.global_size = (width, height);
    }

    pub fn set_scalar(&mut self, slot: u32, value: Scalar) {
        if let Some(ArgumentSlot::Buffer(old)) = self.slots.insert(slot, ArgumentSlot::Scalar(value)) {
            self.device.release(old.handle);
        }
    }

    /// Bind the whole of `host` to `slot`.
    pub fn set_argument(&mut self, slot: u32, host: HostArray, access: AccessMode) -> Result<()> {
        let range = BufferRange::new(0, host.len());
        self.set_argument_range(slot, host, range, access)
    }

    /// Bind `host[range]` to `slot`, uploading it if the kernel reads it.
    ///
    /// A slot keeps its access mode and element type for its lifetime;
    /// changing either is an error and leaves the existing binding intact.
    pub fn set_argument_range(
        &mut self,
        slot: u32,
        host: HostArray,
        range: BufferRange,
        access: AccessMode,
    ) -> Result<()> {
        if range.start > range.end || range.end > host.len() {
            return Err(DeblurError::DeviceBufferRangeOverflow {
                requested: range.end,
                capacity: host.len(),
            });
        }
        if range.is_empty() {
            return Err(DeblurError::EmptyDeviceBuffer { slot });
        }

        let element = host.element_type();
        let reusable = match self.slots.get(&slot) {
            Some(ArgumentSlot::Buffer(existing)) => {
                if existing.element_type() != element {
                    return Err(DeblurError::ElementTypeMismatch {
                        slot,
                        bound: existing.element_type(),
                        requested: element,
                    });
                }
                if existing.access != access {
                    return Err(DeblurError::AccessModeConflict {
                        slot,
                        bound: existing.access,
                        requested: access,
                    });
                }
                (existing.capacity >= range.len()).then_some((existing.handle, existing.capacity))
            }
            _ => None,
        };

        let (handle, capacity) = match reusable {
            Some(existing) => existing,
            None => {
                if let Some(ArgumentSlot::Buffer(old)) = self.slots.remove(&slot) {
                    debug!(slot, old = old.capacity, new = range.len(), "Growing device buffer");
                    self.device.release(old.handle);
                }
                let handle = self.device.allocate(element, range.len(), access)?;
                self.stats.allocations += 1;
                (handle, range.len())
            }
        };

        let upload = access.reads();
        self.slots.insert(
            slot,
            ArgumentSlot::Buffer(DeviceBuffer {
                handle,
                access,
                capacity,
                range,
                host,
            }),
        );
        if upload {
            self.upload_slot(slot)?;
        }
        Ok(())
    }

    /// Change the transferred sub-range of an already bound buffer. No data
    /// moves until the next bind or readback.
    pub fn set_range(&mut self, slot: u32, range: BufferRange) -> Result<()> {
        let buffer = self.buffer_mut(slot)?;
        if range.start > range.end || range.end > buffer.host.len() || range.len() > buffer.capacity {
            return Err(DeblurError::DeviceBufferRangeOverflow {
                requested: range.len(),
                capacity: buffer.capacity.min(buffer.host.len()),
            });
        }
        buffer.range = range;
        Ok(())
    }

    /// Re-upload the current range of a bound buffer from its host array.
    pub fn upload_slot(&mut self, slot: u32) -> Result<()> {
        let device = Arc::clone(&self.device);
        let buffer = self.buffer_mut(slot)?;
        let range = buffer.range;
        device.upload(buffer.handle, 0, &buffer.host.words()[range.start..range.end])?;
        self.stats.uploads += 1;
        Ok(())
    }

    /// Run the kernel and read back every write or read-write slot.
    pub fn execute(&mut self) -> Result<()> {
        self.execute_no_readback()?;
        self.read_back()
    }

    /// Run the kernel, leaving results on the device.
    pub fn execute_no_readback(&mut self) -> Result<()> {
        let (w, h) = self.global_size;
        if w == 0 || h == 0 {
            return Err(DeblurError::InvalidDimensions {
                width: w as usize,
                height: h as usize,
            });
        }
        let args: Vec<(u32, KernelArg)> = self
            .slots
            .iter()
            .map(|(&slot, arg)| {
                let arg = match arg {
                    ArgumentSlot::Scalar(s) => KernelArg::Scalar(*s),
                    ArgumentSlot::Buffer(b) => KernelArg::Buffer(b.handle),
                };
                (slot, arg)
            })
            .collect();
        self.device.dispatch(self.kernel, &args, self.global_size)?;
        self.stats.dispatches += 1;
        Ok(())
    }

    /// Download every write or read-write slot into its host array.
    pub fn read_back(&mut self) -> Result<()> {
        let writable: Vec<u32> = self
            .slots
            .iter()
            .filter_map(|(&slot, arg)| match arg {
                ArgumentSlot::Buffer(b) if b.access.writes() => Some(slot),
                _ => None,
            })
            .collect();
        for slot in writable {
            self.read_back_slot(slot)?;
        }
        Ok(())
    }

    /// Download one slot's current range into its host array.
    pub fn read_back_slot(&mut self, slot: u32) -> Result<()> {
        let device = Arc::clone(&self.device);
        let buffer = self.buffer_mut(slot)?;
        let range = buffer.range;
        device.download(buffer.handle, 0, &mut buffer.host.words_mut()[range.start..range.end])?;
        self.stats.downloads += 1;
        Ok(())
    }

    /// Copy the source slot's current range into the start of the
    /// destination buffer without touching the host.
    pub fn copy_device_to_device(&mut self, src_slot: u32, dst_slot: u32) -> Result<()> {
        let src = self.buffer(src_slot)?;
        let dst = self.buffer(dst_slot)?;
        if src.element_type() != dst.element_type() {
            return Err(DeblurError::ElementTypeMismatch {
                slot: dst_slot,
                bound: dst.element_type(),
                requested: src.element_type(),
            });
        }
        let len = src.range.len();
        if len > dst.capacity {
            return Err(DeblurError::DeviceBufferRangeOverflow {
                requested: len,
                capacity: dst.capacity,
            });
        }
        self.device.copy(src.handle, 0, dst.handle, 0, len)?;
        self.stats.device_copies += 1;
        Ok(())
    }

    pub fn buffer(&self, slot: u32) -> Result<&DeviceBuffer> {
        match self.slots.get(&slot) {
            Some(ArgumentSlot::Buffer(b)) => Ok(b),
            _ => Err(DeblurError::UnboundArgument { slot }),
        }
    }

    fn buffer_mut(&mut self, slot: u32) -> Result<&mut DeviceBuffer> {
        match self.slots.get_mut(&slot) {
            Some(ArgumentSlot::Buffer(b)) => Ok(b),
            _ => Err(DeblurError::UnboundArgument { slot }),
        }
    }

    /// Host array bound to `slot`, as of the last readback.
    pub fn host(&self, slot: u32) -> Option<&HostArray> {
        self.buffer(slot).ok().map(DeviceBuffer::host)
    }

    /// Device buffers currently held by this program.
    pub fn bound_buffers(&self) -> usize {
        self.slots
            .values()
            .filter(|a| matches!(a, ArgumentSlot::Buffer(_)))
            .count()
    }

    /// Release every device buffer and clear all slots.
    pub fn release(&mut self) {
        let released = self.bound_buffers();
        for (_, arg) in std::mem::take(&mut self.slots) {
            if let ArgumentSlot::Buffer(b) = arg {
                self.device.release(b.handle);
            }
        }
        if released > 0 {
            debug!(kind = %self.kind, released, "Released device buffers");
        }
    }
}

impl Drop for KernelProgram {
    fn drop(&mut self) {
        self.release();
    }
}
