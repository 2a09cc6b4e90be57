//! wgpu-based compute device (Metal / Vulkan / DX12).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};
use wgpu::util::DeviceExt;

use crate::consts::GPU_WORKGROUP_SIZE;
use crate::error::{DeblurError, Result};

use super::kernels::PARAMS_BINDING;
use super::{AccessMode, BufferHandle, ComputeDevice, ElementType, KernelArg, KernelHandle, KernelKind};

const WORD: u64 = 4;

fn shader_source(kind: KernelKind) -> &'static str {
    match kind {
        KernelKind::FastRing => include_str!("shaders/fast_ring.wgsl"),
        KernelKind::RichardsonLucy => include_str!("shaders/richardson_lucy.wgsl"),
        KernelKind::Sharpen => include_str!("shaders/sharpen.wgsl"),
        KernelKind::DiskBlur => include_str!("shaders/disk_blur.wgsl"),
    }
}

const fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_name: String,
    pipelines: Mutex<Vec<wgpu::ComputePipeline>>,
    buffers: Mutex<HashMap<u64, wgpu::Buffer>>,
    next_id: AtomicU64,
}

impl WgpuDevice {
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| DeblurError::BackendUnavailable(format!("No suitable GPU adapter found: {e}")))?;

        let adapter_name = adapter.get_info().name.clone();
        info!("GPU adapter: {adapter_name}");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("deblur"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| DeblurError::BackendUnavailable(format!("Failed to create GPU device: {e}")))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
            pipelines: Mutex::new(Vec::new()),
            buffers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        })
    }

    fn buffers(&self) -> Result<MutexGuard<'_, HashMap<u64, wgpu::Buffer>>> {
        self.buffers
            .lock()
            .map_err(|_| DeblurError::Gpu("buffer table poisoned".into()))
    }

    fn pipelines(&self) -> Result<MutexGuard<'_, Vec<wgpu::ComputePipeline>>> {
        self.pipelines
            .lock()
            .map_err(|_| DeblurError::Gpu("pipeline table poisoned".into()))
    }

    fn wait(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| DeblurError::Gpu(format!("device poll failed: {e}")))
    }

    /// Pack scalar arguments in slot order into a uniform block padded to
    /// 16 bytes.
    fn params_buffer(&self, args: &[(u32, KernelArg)]) -> wgpu::Buffer {
        let mut words: Vec<u32> = args
            .iter()
            .filter_map(|(_, a)| match a {
                KernelArg::Scalar(s) => Some(s.to_word()),
                KernelArg::Buffer(_) => None,
            })
            .collect();
        words.resize(words.len().div_ceil(4).max(1) * 4, 0);
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("params"),
            contents: bytemuck::cast_slice(&words),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }
}

impl ComputeDevice for WgpuDevice {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn compile(&self, kind: KernelKind) -> Result<KernelHandle> {
        let label = kind.to_string();
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(shader_source(kind).into()),
        });
        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&label),
            layout: None,
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });
        let mut pipelines = self.pipelines()?;
        pipelines.push(pipeline);
        Ok(KernelHandle(pipelines.len() as u32 - 1))
    }

    fn allocate(&self, element: ElementType, len: usize, access: AccessMode) -> Result<BufferHandle> {
        let size = len.max(1) as u64 * WORD;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.buffers()?.insert(id, buffer);
        debug!(id, %element, len, %access, "GPU buffer allocated");
        Ok(BufferHandle(id))
    }

    fn release(&self, buffer: BufferHandle) {
        if let Ok(mut buffers) = self.buffers.lock() {
            if let Some(b) = buffers.remove(&buffer.0) {
                b.destroy();
            }
        }
    }

    fn upload(&self, buffer: BufferHandle, offset: usize, words: &[u32]) -> Result<()> {
        let buffers = self.buffers()?;
        let target = buffers
            .get(&buffer.0)
            .ok_or_else(|| DeblurError::Gpu(format!("unknown buffer handle {}", buffer.0)))?;
        self.queue
            .write_buffer(target, offset as u64 * WORD, bytemuck::cast_slice(words));
        self.queue.submit(std::iter::empty::<wgpu::CommandBuffer>());
        self.wait()
    }

    fn download(&self, buffer: BufferHandle, offset: usize, out: &mut [u32]) -> Result<()> {
        if out.is_empty() {
            return Ok(());
        }
        let size = out.len() as u64 * WORD;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        {
            let buffers = self.buffers()?;
            let source = buffers
                .get(&buffer.0)
                .ok_or_else(|| DeblurError::Gpu(format!("unknown buffer handle {}", buffer.0)))?;
            let mut enc = self.device.create_command_encoder(&Default::default());
            enc.copy_buffer_to_buffer(source, offset as u64 * WORD, &staging, 0, size);
            self.queue.submit(std::iter::once(enc.finish()));
        }

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            tx.send(r).ok();
        });
        self.wait()?;
        rx.recv()
            .map_err(|_| DeblurError::Gpu("GPU channel closed".into()))?
            .map_err(|e| DeblurError::Gpu(format!("buffer mapping failed: {e}")))?;

        let data = slice.get_mapped_range();
        out.copy_from_slice(bytemuck::cast_slice(&data));
        drop(data);
        staging.unmap();
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
        let buffers = self.buffers()?;
        let lookup = |h: BufferHandle| {
            buffers
                .get(&h.0)
                .ok_or_else(|| DeblurError::Gpu(format!("unknown buffer handle {}", h.0)))
        };
        let (source, target) = (lookup(src)?, lookup(dst)?);
        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.copy_buffer_to_buffer(
            source,
            src_offset as u64 * WORD,
            target,
            dst_offset as u64 * WORD,
            len as u64 * WORD,
        );
        self.queue.submit(std::iter::once(enc.finish()));
        drop(buffers);
        self.wait()
    }

    fn dispatch(&self, kernel: KernelHandle, args: &[(u32, KernelArg)], global: (u32, u32)) -> Result<()> {
        let params = self.params_buffer(args);
        {
            let pipelines = self.pipelines()?;
            let pipeline = pipelines
                .get(kernel.0 as usize)
                .ok_or_else(|| DeblurError::Gpu(format!("unknown kernel handle {}", kernel.0)))?;
            let buffers = self.buffers()?;

            let mut entries = Vec::with_capacity(args.len() + 1);
            for (slot, arg) in args {
                if let KernelArg::Buffer(handle) = arg {
                    let buffer = buffers
                        .get(&handle.0)
                        .ok_or_else(|| DeblurError::Gpu(format!("unknown buffer handle {}", handle.0)))?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: *slot,
                        resource: buffer.as_entire_binding(),
                    });
                }
            }
            entries.push(wgpu::BindGroupEntry {
                binding: PARAMS_BINDING,
                resource: params.as_entire_binding(),
            });

            let layout = pipeline.get_bind_group_layout(0);
            let bg = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: None,
                layout: &layout,
                entries: &entries,
            });
            let mut enc = self.device.create_command_encoder(&Default::default());
            {
                let mut pass = enc.begin_compute_pass(&Default::default());
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bg, &[]);
                pass.dispatch_workgroups(
                    div_ceil(global.0, GPU_WORKGROUP_SIZE),
                    div_ceil(global.1, GPU_WORKGROUP_SIZE),
                    1,
                );
            }
            self.queue.submit(std::iter::once(enc.finish()));
        }
        self.wait()
    }

    fn live_allocations(&self) -> usize {
        self.buffers.lock().map(|b| b.len()).unwrap_or(0)
    }
}
