use ndarray::{s, Array2, ArrayView2};
use num_complex::Complex;
use rayon::prelude::*;
use tracing::debug;

use crate::compute::dft::Dft;
use crate::compute::pool::WorkerPool;
use crate::consts::{COLOR_CHANNEL_COUNT, WIENER_BORDER_MIN, WIENER_BORDER_SCALE};
use crate::error::{DeblurError, Result};
use crate::filters::convolve::clamp_coord;
use crate::kernel::disk::disk_coverage;
use crate::kernel::validate_radius;
use crate::pipeline::types::JobContext;
use crate::raster::Raster;

/// Margins added around the image before the transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WienerPadding {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl WienerPadding {
    /// Margins for a `width`×`height` image: at least the anti-ringing
    /// border, rounded up so each padded side is a fast DFT length.
    pub fn for_image(width: usize, height: usize, radius: f32, snr: f32) -> Self {
        let border = wiener_border(radius, snr);
        let m = optimal_dft_size(height + border) - height;
        let n = optimal_dft_size(width + border) - width;
        Self {
            top: m / 2,
            bottom: m - m / 2,
            left: n / 2,
            right: n - n / 2,
        }
    }

    pub fn padded_dims(&self, width: usize, height: usize) -> (usize, usize) {
        (width + self.left + self.right, height + self.top + self.bottom)
    }
}

/// `floor(sqrt(snr) * radius * 1.1 + 5)` pixels.
pub fn wiener_border(radius: f32, snr: f32) -> usize {
    ((snr as f64).sqrt() * radius as f64 * WIENER_BORDER_SCALE + WIENER_BORDER_MIN).floor() as usize
}

/// Smallest integer ≥ `n` whose only prime factors are 2, 3 and 5.
pub fn optimal_dft_size(n: usize) -> usize {
    let mut candidate = n.max(1);
    loop {
        let mut rest = candidate;
        for p in [2, 3, 5] {
            while rest % p == 0 {
                rest /= p;
            }
        }
        if rest == 1 {
            return candidate;
        }
        candidate += 1;
    }
}

/// Binary disk PSF centred on the origin in wrap-around layout, summing
/// to 1. Indexed `[[x, y]]`.
pub fn disk_psf(radius: f32, width: usize, height: usize) -> Array2<f32> {
    let wrap = |i: usize, n: usize| -> f32 {
        if i <= n / 2 {
            i as f32
        } else {
            i as f32 - n as f32
        }
    };
    let mut psf = Array2::from_shape_fn((width, height), |(x, y)| {
        let (dx, dy) = (wrap(x, width), wrap(y, height));
        if disk_coverage(radius, (dx * dx + dy * dy).sqrt()) > 0.0 {
            1.0
        } else {
            0.0
        }
    });
    let sum = psf.sum();
    if sum > 0.0 {
        psf.mapv_inplace(|v| v / sum);
    }
    psf
}

/// `H* / (|H|² + 1/snr)` for the transformed PSF `H`.
pub fn wiener_filter(psf: &Array2<f32>, snr: f32, dft: &dyn Dft) -> Array2<Complex<f64>> {
    let mut spectrum = psf.mapv(|v| Complex::new(v as f64, 0.0));
    dft.forward(&mut spectrum);
    let k = 1.0 / snr as f64;
    spectrum.mapv_inplace(|h| h.conj() / (h.norm_sqr() + k));
    spectrum
}

fn pad_replicate(plane: &ArrayView2<f32>, pad: &WienerPadding) -> Array2<Complex<f64>> {
    let (w, h) = plane.dim();
    let (pw, ph) = pad.padded_dims(w, h);
    Array2::from_shape_fn((pw, ph), |(x, y)| {
        let sx = clamp_coord(x as isize - pad.left as isize, w);
        let sy = clamp_coord(y as isize - pad.top as isize, h);
        Complex::new(plane[[sx, sy]] as f64, 0.0)
    })
}

/// Frequency-domain deconvolution with a disk PSF, each channel
/// transformed independently. `Ok(None)` if canceled.
pub fn wiener_deconvolve(
    input: &Raster,
    radius: f32,
    snr: f32,
    dft: &dyn Dft,
    pool: &WorkerPool,
    ctx: &JobContext,
) -> Result<Option<Raster>> {
    validate_radius(radius)?;
    if !(snr.is_finite() && snr > 0.0) {
        return Err(DeblurError::Config(format!("SNR must be positive, got {snr}")));
    }

    let (w, h) = input.dims();
    let pad = WienerPadding::for_image(w, h, radius, snr);
    let (pw, ph) = pad.padded_dims(w, h);
    debug!(pw, ph, ?pad, dft = dft.name(), "Wiener padding");

    let filter = wiener_filter(&disk_psf(radius, pw, ph), snr, dft);
    if ctx.is_canceled() {
        return Ok(None);
    }
    ctx.report(0.1);

    let planes: Vec<Option<Array2<f32>>> = pool.install(|| {
        (0..COLOR_CHANNEL_COUNT)
            .into_par_iter()
            .map(|c| {
                if ctx.is_canceled() {
                    return None;
                }
                let mut spectrum = pad_replicate(&input.plane(c), &pad);
                dft.forward(&mut spectrum);
                dft.multiply_spectrum(&mut spectrum, &filter);
                dft.inverse(&mut spectrum);
                let restored = spectrum
                    .slice(s![pad.left..pad.left + w, pad.top..pad.top + h])
                    .mapv(|v| v.re as f32);
                ctx.report(0.3 + 0.2 * c as f64);
                Some(restored)
            })
            .collect()
    });

    if ctx.is_canceled() {
        return Ok(None);
    }
    let mut planes = planes.into_iter().flatten();
    match (planes.next(), planes.next(), planes.next()) {
        (Some(r), Some(g), Some(b)) => Raster::from_planes(r, g, b).map(Some),
        _ => Ok(None),
    }
}
