use ndarray::iter::Iter;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayViewMut1, Axis, Ix3};

use crate::consts::COLOR_CHANNEL_COUNT;
use crate::error::{DeblurError, Result};

/// Three equal-size colour planes of unclamped `f32` samples.
///
/// Storage is a single planar buffer addressed as `[channel][x][y]`, so each
/// image column of one channel is a contiguous run of `height` samples. The
/// same layout is uploaded verbatim to compute devices.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    data: Array3<f32>,
}

impl Raster {
    /// A black raster.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: Array3::zeros((COLOR_CHANNEL_COUNT, width, height)),
        }
    }

    /// A raster with every sample of every channel set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            data: Array3::from_elem((COLOR_CHANNEL_COUNT, width, height), value),
        }
    }

    /// Build a raster from a `(channel, x, y)` generator.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> f32,
    {
        Self {
            data: Array3::from_shape_fn((COLOR_CHANNEL_COUNT, width, height), |(c, x, y)| {
                f(c, x, y)
            }),
        }
    }

    /// Build a raster from three planes indexed `[[x, y]]`.
    pub fn from_planes(red: Array2<f32>, green: Array2<f32>, blue: Array2<f32>) -> Result<Self> {
        let (w, h) = red.dim();
        for plane in [&green, &blue] {
            if plane.dim() != (w, h) {
                return Err(DeblurError::DimensionMismatch {
                    expected: (w, h),
                    actual: plane.dim(),
                });
            }
        }
        Ok(Self::from_fn(w, h, |c, x, y| match c {
            0 => red[[x, y]],
            1 => green[[x, y]],
            _ => blue[[x, y]],
        }))
    }

    /// Wrap a planar `[channel][x][y]` buffer.
    pub fn from_planar(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        let data = Array3::from_shape_vec((COLOR_CHANNEL_COUNT, width, height), data)
            .map_err(|_| DeblurError::InvalidDimensions { width, height })?;
        Ok(Self { data })
    }

    /// Decode an interleaved, row-major RGB byte buffer.
    pub fn from_rgb8_interleaved(width: usize, height: usize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != width * height * COLOR_CHANNEL_COUNT {
            return Err(DeblurError::InvalidDimensions { width, height });
        }
        Ok(Self::from_fn(width, height, |c, x, y| {
            bytes[(y * width + x) * COLOR_CHANNEL_COUNT + c] as f32
        }))
    }

    /// Encode as interleaved, row-major RGB bytes. Samples are clamped to
    /// [0, 255] and truncated here and nowhere else.
    pub fn to_rgb8_interleaved(&self) -> Vec<u8> {
        let (w, h) = self.dims();
        let mut bytes = vec![0u8; w * h * COLOR_CHANNEL_COUNT];
        for c in 0..COLOR_CHANNEL_COUNT {
            for x in 0..w {
                for y in 0..h {
                    bytes[(y * w + x) * COLOR_CHANNEL_COUNT + c] = to_byte(self.data[[c, x, y]]);
                }
            }
        }
        bytes
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().2
    }

    /// `(width, height)`.
    pub fn dims(&self) -> (usize, usize) {
        let (_, w, h) = self.data.dim();
        (w, h)
    }

    pub fn get(&self, channel: usize, x: usize, y: usize) -> f32 {
        self.data[[channel, x, y]]
    }

    pub fn set(&mut self, channel: usize, x: usize, y: usize, value: f32) {
        self.data[[channel, x, y]] = value;
    }

    /// One colour plane, indexed `[[x, y]]`.
    pub fn plane(&self, channel: usize) -> ArrayView2<'_, f32> {
        self.data.slice(s![channel, .., ..])
    }

    /// Every sample in planar `[channel][x][y]` order.
    pub fn samples(&self) -> Iter<'_, f32, Ix3> {
        self.data.iter()
    }

    /// Mutable image columns, one per `(channel, x)`, in planar order:
    /// column `j` is channel `j / width`, x `j % width`.
    pub fn columns_mut(&mut self) -> impl Iterator<Item = ArrayViewMut1<'_, f32>> {
        self.data.lanes_mut(Axis(2)).into_iter()
    }

    pub fn to_planar_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Root-mean-square difference after removing each channel's mean
    /// brightness from both images.
    pub fn normalized_rmse(&self, other: &Raster) -> Result<f64> {
        if self.dims() != other.dims() {
            return Err(DeblurError::DimensionMismatch {
                expected: self.dims(),
                actual: other.dims(),
            });
        }
        let (w, h) = self.dims();
        let n = (w * h) as f64;
        let mut total = 0.0f64;
        for c in 0..COLOR_CHANNEL_COUNT {
            let a = self.plane(c);
            let b = other.plane(c);
            let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
            let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;
            total += a
                .iter()
                .zip(b.iter())
                .map(|(&va, &vb)| {
                    let e = (va as f64 - mean_a) - (vb as f64 - mean_b);
                    e * e
                })
                .sum::<f64>();
        }
        Ok((total / (n * COLOR_CHANNEL_COUNT as f64)).sqrt())
    }
}

fn to_byte(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}
