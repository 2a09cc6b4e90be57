use ndarray::ArrayViewMut1;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{COLOR_CHANNEL_COUNT, PROGRESS_COLUMN_INTERVAL};
use crate::error::{DeblurError, Result};
use crate::pipeline::types::{JobContext, ProgressSpan};
use crate::raster::Raster;

/// Fixed-size worker pool for the CPU backend.
///
/// A sweep splits the output columns (of all three channels) into one lane
/// per worker, lane `k` owning every column whose x is congruent to `k`
/// modulo the worker count. Every sweep returns only after all lanes finish.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// `threads == 0` uses every available core.
    pub fn new(threads: usize) -> Result<Self> {
        let workers = if threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("deblur-worker-{i}"))
            .build()
            .map_err(|e| DeblurError::WorkerPool(e.to_string()))?;
        debug!(workers, "Worker pool started");
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` inside the pool so nested rayon work uses its threads.
    pub fn install<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(f)
    }

    /// Fill every sample of `out` with `sample(channel, x, y)`.
    ///
    /// Cancellation is polled between columns and lane 0 reports progress
    /// every few columns inside `span`. Returns `false` if the sweep stopped
    /// early because the job was canceled; `out` is then partially written.
    pub fn sweep<F>(&self, out: &mut Raster, ctx: &JobContext, span: ProgressSpan, sample: F) -> bool
    where
        F: Fn(usize, usize, usize) -> f32 + Sync,
    {
        let (w, h) = out.dims();
        if w == 0 || h == 0 {
            return !ctx.is_canceled();
        }
        let total_columns = COLOR_CHANNEL_COUNT * w;
        let workers = self.workers;

        let mut lanes: Vec<Vec<(usize, ArrayViewMut1<'_, f32>)>> = (0..workers).map(|_| Vec::new()).collect();
        for (j, column) in out.columns_mut().enumerate() {
            lanes[(j % w) % workers].push((j, column));
        }

        self.pool.install(|| {
            lanes.into_par_iter().enumerate().for_each(|(lane, columns)| {
                for (done, (j, mut column)) in columns.into_iter().enumerate() {
                    if ctx.is_canceled() {
                        return;
                    }
                    let (c, x) = (j / w, j % w);
                    for (y, v) in column.iter_mut().enumerate() {
                        *v = sample(c, x, y);
                    }
                    if lane == 0 && done % PROGRESS_COLUMN_INTERVAL == 0 {
                        ctx.report(span.at(j as f64 / total_columns as f64));
                    }
                }
            });
        });

        if ctx.is_canceled() {
            return false;
        }
        ctx.report(span.end);
        true
    }
}
