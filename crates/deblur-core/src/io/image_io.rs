use std::path::Path;

use image::RgbImage;
use tracing::info;

use crate::error::{DeblurError, Result};
use crate::raster::Raster;

/// Load any image the `image` crate understands as an RGB raster with
/// samples in [0, 255].
pub fn load_raster(path: &Path) -> Result<Raster> {
    let img = image::open(path)?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    info!(path = %path.display(), width = w, height = h, "Loaded image");
    Raster::from_rgb8_interleaved(w as usize, h as usize, rgb.as_raw())
}

/// Save as 8-bit RGB; the format follows the file extension.
pub fn save_raster(raster: &Raster, path: &Path) -> Result<()> {
    let (w, h) = raster.dims();
    let img = RgbImage::from_raw(w as u32, h as u32, raster.to_rgb8_interleaved())
        .ok_or(DeblurError::InvalidDimensions { width: w, height: h })?;
    img.save(path)?;
    info!(path = %path.display(), width = w, height = h, "Saved image");
    Ok(())
}
