use std::sync::Arc;

use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis, Zip};
use num_complex::Complex;
use rustfft::{Fft, FftDirection, FftPlanner};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Two-dimensional discrete Fourier transform used by Wiener deconvolution.
pub trait Dft: Send + Sync {
    fn name(&self) -> &str;

    /// In-place forward transform.
    fn forward(&self, data: &mut Array2<Complex<f64>>);

    /// In-place inverse transform, normalised by `1/(rows*cols)`.
    fn inverse(&self, data: &mut Array2<Complex<f64>>);

    /// Element-wise product with a spectrum of the same shape.
    fn multiply_spectrum(&self, data: &mut Array2<Complex<f64>>, filter: &Array2<Complex<f64>>) {
        Zip::from(data).and(filter).for_each(|d, &f| *d *= f);
    }
}

/// `rustfft`-backed row/column transform.
#[derive(Clone, Copy, Debug, Default)]
pub struct RustFftDft;

impl Dft for RustFftDft {
    fn name(&self) -> &str {
        "rustfft"
    }

    fn forward(&self, data: &mut Array2<Complex<f64>>) {
        transform(data, FftDirection::Forward);
    }

    fn inverse(&self, data: &mut Array2<Complex<f64>>) {
        transform(data, FftDirection::Inverse);
        let (rows, cols) = data.dim();
        let scale = 1.0 / (rows * cols) as f64;
        data.mapv_inplace(|v| v * scale);
    }
}

fn transform(data: &mut Array2<Complex<f64>>, direction: FftDirection) {
    let (rows, cols) = data.dim();
    if rows == 0 || cols == 0 {
        return;
    }
    let mut planner = FftPlanner::new();
    let along_row = planner.plan_fft(cols, direction);
    let along_col = planner.plan_fft(rows, direction);

    if rows * cols >= PARALLEL_PIXEL_THRESHOLD {
        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|lane| process_lane(&along_row, lane));
        data.axis_iter_mut(Axis(1))
            .into_par_iter()
            .for_each(|lane| process_lane(&along_col, lane));
    } else {
        for lane in data.axis_iter_mut(Axis(0)) {
            process_lane(&along_row, lane);
        }
        for lane in data.axis_iter_mut(Axis(1)) {
            process_lane(&along_col, lane);
        }
    }
}

fn process_lane(fft: &Arc<dyn Fft<f64>>, mut lane: ArrayViewMut1<Complex<f64>>) {
    if let Some(slice) = lane.as_slice_mut() {
        fft.process(slice);
        return;
    }
    let mut buf = lane.to_vec();
    fft.process(&mut buf);
    lane.assign(&ArrayView1::from(&buf));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_then_inverse_restores_input() {
        let original = Array2::from_shape_fn((6, 10), |(r, c)| Complex::new((r * 10 + c) as f64, 0.0));
        let mut data = original.clone();
        RustFftDft.forward(&mut data);
        RustFftDft.inverse(&mut data);
        for (a, b) in data.iter().zip(original.iter()) {
            assert!((a.re - b.re).abs() < 1e-9);
            assert!(a.im.abs() < 1e-9);
        }
    }

    #[test]
    fn dc_term_is_the_sum() {
        let mut data = Array2::from_elem((4, 5), Complex::new(2.0, 0.0));
        RustFftDft.forward(&mut data);
        assert!((data[[0, 0]].re - 40.0).abs() < 1e-9);
    }
}
