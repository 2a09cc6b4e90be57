use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Receives progress from a running operation.
///
/// Methods have default no-op implementations so callers only override
/// what they display.
pub trait ProgressSink: Send + Sync {
    /// Name of the phase currently running ("Deblurring", "Sharpening", ...).
    fn set_label(&self, _label: &str) {}
    /// Completed fraction in [0, 1].
    fn update(&self, _fraction: f64) {}
}

/// Discards all progress.
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {}

/// Shared cancellation flag. Cloning yields a handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Sub-range of the overall progress bar assigned to one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSpan {
    pub start: f64,
    pub end: f64,
}

impl ProgressSpan {
    pub const FULL: ProgressSpan = ProgressSpan { start: 0.0, end: 1.0 };

    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Slice `index` of `count` equal parts of this span.
    pub fn part(&self, index: usize, count: usize) -> Self {
        let step = (self.end - self.start) / count.max(1) as f64;
        Self::new(
            self.start + step * index as f64,
            self.start + step * (index + 1) as f64,
        )
    }

    pub fn at(&self, fraction: f64) -> f64 {
        self.start + (self.end - self.start) * fraction
    }
}

/// Progress and cancellation for one submitted operation.
///
/// Reported fractions never go backwards: an update smaller than the last
/// one delivered is dropped.
pub struct JobContext {
    progress: Arc<dyn ProgressSink>,
    cancel: CancelToken,
    last: AtomicU64,
}

impl JobContext {
    pub fn new(progress: Arc<dyn ProgressSink>, cancel: CancelToken) -> Self {
        Self {
            progress,
            cancel,
            last: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// No progress display and a private cancel flag.
    pub fn detached() -> Self {
        Self::new(Arc::new(NoOpProgress), CancelToken::new())
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }

    pub fn set_label(&self, label: &str) {
        self.progress.set_label(label);
    }

    pub fn report(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let advanced = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                (fraction > f64::from_bits(prev)).then_some(fraction.to_bits())
            })
            .is_ok();
        if advanced {
            self.progress.update(fraction);
        }
    }

    /// Last fraction delivered to the sink.
    pub fn last_reported(&self) -> f64 {
        f64::from_bits(self.last.load(Ordering::Acquire))
    }
}
