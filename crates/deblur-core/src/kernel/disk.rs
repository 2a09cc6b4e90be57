use ndarray::Array2;

use crate::consts::SHARPEN_EDGE_SLOPE;
use crate::error::{DeblurError, Result};

use super::validate_radius;

/// How cell weights fall off with distance from the centre.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskProfile {
    /// 1 inside the disk, 0 outside.
    Binary,
    /// Like `Binary`, but cells exactly on the rim (`d = r + 0.5`) count as
    /// inside. Used by the plain disk blur.
    BinaryClosed,
    /// `clamp((r - d + 0.5) * 1.6, 0, 1)` with the centre cell zeroed.
    Graded,
}

/// Coverage of a cell at distance `dist` by a disk of `radius`. Positive
/// means the cell centre lies inside, zero means it sits on the rim.
pub fn disk_coverage(radius: f32, dist: f32) -> f32 {
    radius - dist + 0.5
}

/// Square `(2·half + 1)²` matrix of non-negative weights indexed
/// `[[dx + half, dy + half]]`.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightMatrix {
    weights: Array2<f32>,
}

impl WeightMatrix {
    pub fn half_width(&self) -> usize {
        self.weights.dim().0 / 2
    }

    /// Edge length of the matrix.
    pub fn size(&self) -> usize {
        self.weights.dim().0
    }

    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Weight at offset `(dx, dy)` from the centre; 0 outside the matrix.
    pub fn weight(&self, dx: isize, dy: isize) -> f32 {
        let half = self.half_width() as isize;
        if dx.abs() > half || dy.abs() > half {
            return 0.0;
        }
        self.weights[[(dx + half) as usize, (dy + half) as usize]]
    }

    pub fn total(&self) -> f32 {
        self.weights.sum()
    }

    /// Non-zero cells as `(dx, dy, weight)`.
    pub fn taps(&self) -> impl Iterator<Item = (isize, isize, f32)> + '_ {
        let half = self.half_width() as isize;
        self.weights
            .indexed_iter()
            .filter(|(_, &w)| w > 0.0)
            .map(move |((i, j), &w)| (i as isize - half, j as isize - half, w))
    }

    /// Row-major (dx outer) flattening used by device kernels.
    pub fn to_flat(&self) -> Vec<f32> {
        self.weights.iter().copied().collect()
    }

    pub fn from_flat(size: usize, flat: &[f32]) -> Result<Self> {
        let weights = Array2::from_shape_vec((size, size), flat.to_vec())
            .map_err(|_| DeblurError::InvalidDimensions { width: size, height: size })?;
        Ok(Self { weights })
    }
}

/// Disk weight matrix of the given radius. Half-width is `floor(r + 0.5)`.
pub fn disk_weights(radius: f32, profile: DiskProfile) -> Result<WeightMatrix> {
    validate_radius(radius)?;
    let half = (radius + 0.5).floor() as isize;
    let size = (2 * half + 1) as usize;

    let mut weights = Array2::from_shape_fn((size, size), |(i, j)| {
        let dx = (i as isize - half) as f32;
        let dy = (j as isize - half) as f32;
        let coverage = disk_coverage(radius, (dx * dx + dy * dy).sqrt());
        match profile {
            DiskProfile::Binary if coverage > 0.0 => 1.0,
            DiskProfile::BinaryClosed if coverage >= 0.0 => 1.0,
            DiskProfile::Binary | DiskProfile::BinaryClosed => 0.0,
            DiskProfile::Graded => (coverage * SHARPEN_EDGE_SLOPE).clamp(0.0, 1.0),
        }
    });
    if profile == DiskProfile::Graded {
        weights[[half as usize, half as usize]] = 0.0;
    }

    Ok(WeightMatrix { weights })
}
