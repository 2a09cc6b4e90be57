use ndarray::ArrayView2;

use crate::kernel::{KernelOffsetSet, WeightMatrix};

/// Clamp a possibly out-of-range coordinate onto `[0, len)`.
#[inline]
pub fn clamp_coord(v: isize, len: usize) -> usize {
    v.clamp(0, len as isize - 1) as usize
}

#[inline]
fn sample(plane: &ArrayView2<f32>, x: isize, y: isize) -> f32 {
    let (w, h) = plane.dim();
    plane[[clamp_coord(x, w), clamp_coord(y, h)]]
}

/// Sum of `plane` over every offset of `ring` centred on `(x, y)`.
pub fn ring_sum(plane: &ArrayView2<f32>, ring: &KernelOffsetSet, x: usize, y: usize) -> f32 {
    let (x, y) = (x as isize, y as isize);
    ring.iter()
        .map(|(dx, dy)| sample(plane, x + dx as isize, y + dy as isize))
        .sum()
}

pub fn ring_mean(plane: &ArrayView2<f32>, ring: &KernelOffsetSet, x: usize, y: usize) -> f32 {
    ring_sum(plane, ring, x, y) / ring.len() as f32
}

/// `(Σ w·v, Σ w)` over the non-zero cells of `matrix` centred on `(x, y)`.
pub fn weighted_window(plane: &ArrayView2<f32>, matrix: &WeightMatrix, x: usize, y: usize) -> (f32, f32) {
    let (x, y) = (x as isize, y as isize);
    matrix
        .taps()
        .fold((0.0, 0.0), |(sum, total), (dx, dy, w)| {
            (sum + w * sample(plane, x + dx, y + dy), total + w)
        })
}

/// Weighted mean of the window; the centre sample if every weight is zero.
pub fn window_mean(plane: &ArrayView2<f32>, matrix: &WeightMatrix, x: usize, y: usize) -> f32 {
    let (sum, total) = weighted_window(plane, matrix, x, y);
    if total > 0.0 {
        sum / total
    } else {
        plane[[x, y]]
    }
}

/// Unsharp-style contrast boost against a graded disk whose centre weight
/// is zero, blended with the original sample.
pub fn sharpen_sample(plane: &ArrayView2<f32>, matrix: &WeightMatrix, blend: f32, x: usize, y: usize) -> f32 {
    let centre = plane[[x, y]];
    let (weighted, total) = weighted_window(plane, matrix, x, y);
    let total = total + 1.0;
    let boosted = (centre - weighted / total) * total;
    boosted * blend + centre * (1.0 - blend)
}
