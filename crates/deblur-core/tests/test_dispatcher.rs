#[allow(dead_code)]
mod common;

use std::sync::Arc;

use deblur_core::compute::{Backend, ComputeDevice, DevicePreference, HostDevice, KernelKind};
use deblur_core::error::{DeblurError, Result};
use deblur_core::pipeline::config::{DeblurConfig, FastTuning, MethodConfig};
use deblur_core::pipeline::dispatcher::{Dispatcher, PreviewFrame, PreviewSink};
use deblur_core::raster::Raster;

const METHODS: [MethodConfig; 4] = [
    MethodConfig::Fast {
        amount: 1.2,
        radius: 2.0,
        iterations: 3,
    },
    MethodConfig::RichardsonLucy {
        radius: 1.5,
        iterations: 2,
    },
    MethodConfig::Sharpen {
        weight: 2.0,
        radius: 2.5,
    },
    MethodConfig::DiskBlur { radius: 2.0 },
];

fn host_backend() -> (Arc<HostDevice>, Backend) {
    let device = Arc::new(HostDevice::new());
    (device.clone(), Backend::GpuCompute(device))
}

// ---------------------------------------------------------------------------
// Backend equivalence
// ---------------------------------------------------------------------------

#[test]
fn device_path_matches_cpu_path() {
    let input = common::textured_raster(13, 9);
    let mut cpu = Dispatcher::new(Backend::Cpu, 3).unwrap();
    let (_device, backend) = host_backend();
    let mut gpu = Dispatcher::new(backend, 3).unwrap();

    for method in METHODS {
        let a = cpu.run(&method, &input, &common::detached()).unwrap().unwrap();
        let b = gpu.run(&method, &input, &common::detached()).unwrap().unwrap();
        let diff = common::max_abs_diff(&a, &b);
        assert!(diff < 1e-2, "{method}: max diff {diff}");
    }
}

#[test]
fn wiener_runs_on_cpu_for_device_backends() {
    let input = common::textured_raster(20, 16);
    let method = MethodConfig::Wiener { radius: 2.0, snr: 300.0 };
    let mut cpu = Dispatcher::new(Backend::Cpu, 2).unwrap();
    let (device, backend) = host_backend();
    let mut gpu = Dispatcher::new(backend, 2).unwrap();

    let a = cpu.run(&method, &input, &common::detached()).unwrap().unwrap();
    let b = gpu.run(&method, &input, &common::detached()).unwrap().unwrap();
    assert!(common::max_abs_diff(&a, &b) < 1e-3);
    assert_eq!(device.live_allocations(), 0);
    assert_eq!(gpu.session().live_programs(), 0);
}

#[test]
fn tuning_changes_fast_result() {
    let input = common::textured_raster(12, 12);
    let method = MethodConfig::Fast {
        amount: 2.0,
        radius: 2.0,
        iterations: 2,
    };
    let mut default = Dispatcher::new(Backend::Cpu, 2).unwrap();
    let mut tuned = Dispatcher::new(Backend::Cpu, 2)
        .unwrap()
        .with_tuning(FastTuning { inner_scale: 0.0 });
    let a = default.run(&method, &input, &common::detached()).unwrap().unwrap();
    let b = tuned.run(&method, &input, &common::detached()).unwrap().unwrap();
    assert!(common::max_abs_diff(&a, &b) > 1e-3);
}

// ---------------------------------------------------------------------------
// Session lifetime
// ---------------------------------------------------------------------------

#[test]
fn session_reuses_device_buffers_across_runs() {
    let input = common::textured_raster(16, 10);
    let method = METHODS[0];
    let (device, backend) = host_backend();
    let mut dispatcher = Dispatcher::new(backend, 2).unwrap();

    dispatcher.run(&method, &input, &common::detached()).unwrap().unwrap();
    let first = dispatcher.session().program(KernelKind::FastRing).unwrap().stats();
    dispatcher.run(&method, &input, &common::detached()).unwrap().unwrap();
    let second = dispatcher.session().program(KernelKind::FastRing).unwrap().stats();

    assert_eq!(first.allocations, 6);
    assert_eq!(second.allocations, 6);
    assert_eq!(second.dispatches, 6);
    // two chained copies per three-iteration run
    assert_eq!(second.device_copies, 4);
    assert_eq!(device.live_allocations(), 6);

    dispatcher.end_session();
    assert_eq!(device.live_allocations(), 0);
}

#[test]
fn switching_backend_releases_device_resources() {
    let input = common::textured_raster(8, 8);
    let (device, backend) = host_backend();
    let mut dispatcher = Dispatcher::new(backend, 2).unwrap();
    dispatcher.run(&METHODS[3], &input, &common::detached()).unwrap().unwrap();
    assert!(device.live_allocations() > 0);

    dispatcher.set_backend(Backend::Cpu);
    assert_eq!(device.live_allocations(), 0);
    assert!(dispatcher.backend().is_cpu());
}

#[test]
fn dropping_dispatcher_releases_device_resources() {
    let input = common::textured_raster(8, 8);
    let (device, backend) = host_backend();
    let mut dispatcher = Dispatcher::new(backend, 2).unwrap();
    dispatcher.run(&METHODS[1], &input, &common::detached()).unwrap().unwrap();
    drop(dispatcher);
    assert_eq!(device.live_allocations(), 0);
}

// ---------------------------------------------------------------------------
// Cancellation and errors
// ---------------------------------------------------------------------------

#[test]
fn cancel_on_device_releases_session() {
    let input = common::textured_raster(16, 16);
    let (device, backend) = host_backend();
    let mut dispatcher = Dispatcher::new(backend, 2).unwrap();
    dispatcher.run(&METHODS[3], &input, &common::detached()).unwrap().unwrap();

    for method in &METHODS[..2] {
        let out = dispatcher.run(method, &input, &common::canceled()).unwrap();
        assert!(out.is_none());
        assert_eq!(dispatcher.session().live_programs(), 0);
        assert_eq!(device.live_allocations(), 0);
    }
}

#[test]
fn cancel_on_cpu_returns_none() {
    let input = common::textured_raster(16, 16);
    let mut dispatcher = Dispatcher::new(Backend::Cpu, 2).unwrap();
    for method in METHODS {
        assert!(dispatcher.run(&method, &input, &common::canceled()).unwrap().is_none());
    }
}

#[test]
fn cancel_during_device_run_releases_session() {
    let input = common::textured_raster(16, 16);
    let method = MethodConfig::Fast {
        amount: 1.0,
        radius: 2.0,
        iterations: 6,
    };
    let (device, backend) = host_backend();
    let mut dispatcher = Dispatcher::new(backend, 2).unwrap();

    let out = dispatcher.run(&method, &input, &common::cancel_after(2)).unwrap();
    assert!(out.is_none());
    assert_eq!(dispatcher.session().live_programs(), 0);
    assert_eq!(device.live_allocations(), 0);

    // The session is rebuilt on the next run
    assert!(dispatcher.run(&method, &input, &common::detached()).unwrap().is_some());
}

#[test]
fn cancel_during_cpu_run_returns_none() {
    let input = common::textured_raster(40, 24);
    let method = MethodConfig::RichardsonLucy {
        radius: 2.0,
        iterations: 4,
    };
    let mut dispatcher = Dispatcher::new(Backend::Cpu, 2).unwrap();
    assert!(dispatcher.run(&method, &input, &common::cancel_after(2)).unwrap().is_none());
}

#[test]
fn error_on_device_releases_session() {
    let input = common::textured_raster(8, 8);
    let (device, backend) = host_backend();
    let mut dispatcher = Dispatcher::new(backend, 2).unwrap();
    dispatcher.run(&METHODS[3], &input, &common::detached()).unwrap().unwrap();

    let err = dispatcher
        .run(&MethodConfig::DiskBlur { radius: 0.0 }, &input, &common::detached())
        .unwrap_err();
    assert!(matches!(err, DeblurError::InvalidKernelRadius { .. }));
    assert_eq!(device.live_allocations(), 0);
}

#[test]
fn empty_raster_is_rejected() {
    let mut dispatcher = Dispatcher::new(Backend::Cpu, 1).unwrap();
    let err = dispatcher
        .run(&METHODS[3], &Raster::new(0, 4), &common::detached())
        .unwrap_err();
    assert!(matches!(err, DeblurError::InvalidDimensions { .. }));
}

#[test]
fn zero_iterations_returns_input_on_every_backend() {
    let input = common::textured_raster(9, 9);
    let method = MethodConfig::RichardsonLucy {
        radius: 2.0,
        iterations: 0,
    };
    let (_device, backend) = host_backend();
    for backend in [Backend::Cpu, backend] {
        let mut dispatcher = Dispatcher::new(backend, 2).unwrap();
        assert_eq!(dispatcher.run(&method, &input, &common::detached()).unwrap().unwrap(), input);
    }
}

#[test]
fn bad_radius_is_rejected_even_without_iterations() {
    let input = common::textured_raster(6, 6);
    let methods = [
        MethodConfig::Fast {
            amount: 1.0,
            radius: -1.0,
            iterations: 0,
        },
        MethodConfig::RichardsonLucy {
            radius: 0.0,
            iterations: 0,
        },
        MethodConfig::DiskBlur { radius: f32::NAN },
    ];
    let (device, backend) = host_backend();
    for backend in [Backend::Cpu, backend] {
        let mut dispatcher = Dispatcher::new(backend, 2).unwrap();
        for method in &methods {
            let err = dispatcher.run(method, &input, &common::detached()).unwrap_err();
            assert!(matches!(err, DeblurError::InvalidKernelRadius { .. }), "{method}: {err}");
        }
    }
    assert_eq!(device.live_allocations(), 0);
}

#[test]
fn adjust_runs_on_cpu_for_device_backends() {
    let input = common::textured_raster(10, 7);
    let method = MethodConfig::Adjust {
        contrast: 12.0,
        brightness: -5.0,
        saturation: 0.5,
        exposure: 1.5,
    };
    let mut cpu = Dispatcher::new(Backend::Cpu, 2).unwrap();
    let (device, backend) = host_backend();
    let mut gpu = Dispatcher::new(backend, 2).unwrap();

    let a = cpu.run(&method, &input, &common::detached()).unwrap().unwrap();
    let b = gpu.run(&method, &input, &common::detached()).unwrap().unwrap();
    assert_eq!(a, b);
    assert_ne!(a, input);
    assert_eq!(device.live_allocations(), 0);
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[test]
fn progress_is_monotonic_and_completes() {
    let input = common::textured_raster(40, 30);
    let (device, backend) = host_backend();
    drop(device);
    for backend in [Backend::Cpu, backend] {
        let mut dispatcher = Dispatcher::new(backend, 3).unwrap();
        for method in METHODS {
            let (progress, ctx) = common::recording();
            dispatcher.run(&method, &input, &ctx).unwrap().unwrap();

            let updates = progress.updates.lock().unwrap();
            assert!(updates.windows(2).all(|w| w[0] <= w[1]), "{method}: {updates:?}");
            assert_eq!(updates.last().copied(), Some(1.0));
            let labels = progress.labels.lock().unwrap();
            assert_eq!(labels.first().map(String::as_str), Some(method.label()));
        }
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FrameLog {
    host: usize,
    device: Vec<(KernelKind, u32, usize, usize)>,
}

impl PreviewSink for FrameLog {
    fn present(&mut self, frame: PreviewFrame<'_>) -> Result<()> {
        match frame {
            PreviewFrame::Host(_) => self.host += 1,
            PreviewFrame::Device {
                program,
                slot,
                width,
                height,
            } => self.device.push((program.kind(), slot, width, height)),
        }
        Ok(())
    }
}

#[test]
fn raster_backend_previews_from_device_memory() {
    let input = common::textured_raster(10, 6);
    let device = Arc::new(HostDevice::new());
    let mut dispatcher = Dispatcher::new(Backend::GpuRaster(device.clone()), 2).unwrap();
    let mut log = FrameLog::default();

    assert!(dispatcher
        .preview(&METHODS[2], &input, &common::detached(), &mut log)
        .unwrap());
    assert_eq!(log.host, 0);
    assert_eq!(log.device, vec![(KernelKind::Sharpen, 0, 10, 6)]);
    // result was never read back
    let stats = dispatcher.session().program(KernelKind::Sharpen).unwrap().stats();
    assert_eq!(stats.downloads, 0);

    // Wiener has no device kernel and is presented from the host
    let wiener = MethodConfig::Wiener { radius: 1.0, snr: 100.0 };
    assert!(dispatcher.preview(&wiener, &input, &common::detached(), &mut log).unwrap());
    assert_eq!(log.host, 1);
}

#[test]
fn compute_backend_previews_from_host() {
    let input = common::textured_raster(10, 6);
    let (_device, backend) = host_backend();
    let mut dispatcher = Dispatcher::new(backend, 2).unwrap();
    let mut log = FrameLog::default();
    assert!(dispatcher
        .preview(&METHODS[0], &input, &common::detached(), &mut log)
        .unwrap());
    assert_eq!(log.host, 1);
    assert!(log.device.is_empty());

    assert!(!dispatcher
        .preview(&METHODS[0], &input, &common::canceled(), &mut log)
        .unwrap());
    assert_eq!(log.host, 1);
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn from_config_uses_cpu_and_thread_count() {
    let config = DeblurConfig {
        device: DevicePreference::Cpu,
        threads: 3,
        ..DeblurConfig::default()
    };
    let dispatcher = Dispatcher::from_config(&config).unwrap();
    assert!(dispatcher.backend().is_cpu());
    assert_eq!(dispatcher.workers(), 3);
}
