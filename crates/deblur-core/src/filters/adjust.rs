use crate::compute::pool::WorkerPool;
use crate::consts::{
    ADJUST_CONTRAST_BASE, ADJUST_MIDPOINT, COLOR_CHANNEL_COUNT, EXPOSURE_FALLBACK_STOPS,
    EXPOSURE_GAMMA_SLOPE, EXPOSURE_KNEE,
};
use crate::error::Result;
use crate::pipeline::types::{JobContext, ProgressSpan};
use crate::raster::Raster;

/// Tone adjustments applied per pixel. The default leaves the image as is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustParams {
    /// Slider steps; the gain around mid-grey is `1.03^contrast`.
    pub contrast: f32,
    /// Offset added after the contrast gain.
    pub brightness: f32,
    /// Distance from the pixel's channel mean, 1 = unchanged.
    pub saturation: f32,
    /// Exposure in stops, 1 = unchanged.
    pub exposure: f32,
}

impl Default for AdjustParams {
    fn default() -> Self {
        Self {
            contrast: 0.0,
            brightness: 0.0,
            saturation: 1.0,
            exposure: 1.0,
        }
    }
}

impl AdjustParams {
    pub fn contrast_gain(&self) -> f32 {
        ADJUST_CONTRAST_BASE.powf(self.contrast)
    }

    fn exposure_gamma(&self) -> f32 {
        2f32.powf((self.exposure - 1.0) * EXPOSURE_GAMMA_SLOPE)
    }

    /// Adjust one RGB pixel.
    pub fn apply(&self, rgb: [f32; COLOR_CHANNEL_COUNT]) -> [f32; COLOR_CHANNEL_COUNT] {
        let gain = self.contrast_gain();
        let gamma = self.exposure_gamma();
        let mut out = rgb.map(|v| {
            let v = (v - ADJUST_MIDPOINT) * gain + ADJUST_MIDPOINT + self.brightness;
            if self.exposure != 1.0 {
                expose(v, self.exposure, gamma)
            } else {
                v
            }
        });
        if self.saturation != 1.0 {
            let mean = out.iter().sum::<f32>() / COLOR_CHANNEL_COUNT as f32;
            for v in &mut out {
                *v = mean + (*v - mean) * self.saturation;
            }
        }
        out
    }
}

/// Exposure curve: levels up to the knee are bent by `gamma` onto
/// [.., 255], levels above it are compressed by `2^exposure`.
pub fn expose(value: f32, exposure: f32, gamma: f32) -> f32 {
    if value <= EXPOSURE_KNEE {
        (1.0 - (1.0 - value / EXPOSURE_KNEE).powf(gamma)) * 255.0
    } else {
        let stops = if exposure <= 0.0 {
            EXPOSURE_FALLBACK_STOPS
        } else {
            exposure
        };
        (value - EXPOSURE_KNEE) / 2f32.powf(stops) + 255.0
    }
}

/// Contrast, brightness, exposure and saturation in one pass. `Ok(None)`
/// if canceled.
pub fn adjust(input: &Raster, params: &AdjustParams, pool: &WorkerPool, ctx: &JobContext) -> Result<Option<Raster>> {
    let (w, h) = input.dims();
    let mut out = Raster::new(w, h);

    let done = pool.sweep(&mut out, ctx, ProgressSpan::FULL, |c, x, y| {
        let rgb = [input.get(0, x, y), input.get(1, x, y), input.get(2, x, y)];
        params.apply(rgb)[c]
    });
    Ok(done.then_some(out))
}
