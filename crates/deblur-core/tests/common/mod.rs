use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use deblur_core::compute::pool::WorkerPool;
use deblur_core::pipeline::types::{CancelToken, JobContext, ProgressSink};
use deblur_core::raster::Raster;

/// Smooth ramp plus a bright square, distinct per channel.
pub fn textured_raster(width: usize, height: usize) -> Raster {
    Raster::from_fn(width, height, |c, x, y| {
        let ramp = (x * 7 + y * 3 + c * 11) as f32 % 97.0;
        let square = if (width / 4..width / 2).contains(&x) && (height / 4..height / 2).contains(&y) {
            120.0
        } else {
            0.0
        };
        20.0 + ramp + square
    })
}

pub fn pool(workers: usize) -> WorkerPool {
    WorkerPool::new(workers).unwrap()
}

pub fn detached() -> JobContext {
    JobContext::detached()
}

pub fn canceled() -> JobContext {
    let token = CancelToken::new();
    token.cancel();
    JobContext::new(Arc::new(RecordingProgress::default()), token)
}

pub fn max_abs_diff(a: &Raster, b: &Raster) -> f32 {
    assert_eq!(a.dims(), b.dims());
    a.samples()
        .zip(b.samples())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

/// Progress sink that records everything it receives.
#[derive(Default)]
pub struct RecordingProgress {
    pub labels: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<f64>>,
}

impl ProgressSink for RecordingProgress {
    fn set_label(&self, label: &str) {
        self.labels.lock().unwrap().push(label.to_string());
    }

    fn update(&self, fraction: f64) {
        self.updates.lock().unwrap().push(fraction);
    }
}

pub fn recording() -> (Arc<RecordingProgress>, JobContext) {
    let progress = Arc::new(RecordingProgress::default());
    let ctx = JobContext::new(progress.clone(), CancelToken::new());
    (progress, ctx)
}

/// Progress sink that trips `token` once it has seen `after` updates.
pub struct CancelAfter {
    token: CancelToken,
    after: usize,
    seen: AtomicUsize,
}

impl ProgressSink for CancelAfter {
    fn update(&self, _fraction: f64) {
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.token.cancel();
        }
    }
}

pub fn cancel_after(updates: usize) -> JobContext {
    let token = CancelToken::new();
    let sink = CancelAfter {
        token: token.clone(),
        after: updates,
        seen: AtomicUsize::new(0),
    };
    JobContext::new(Arc::new(sink), token)
}
