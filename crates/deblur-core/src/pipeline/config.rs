use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compute::DevicePreference;
use crate::consts::FAST_INNER_SCALE;

/// Which operation to run, with its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MethodConfig {
    /// Ring-gradient iterative deblur.
    Fast {
        amount: f32,
        radius: f32,
        iterations: usize,
    },
    RichardsonLucy { radius: f32, iterations: usize },
    /// Frequency-domain inverse filter, CPU only.
    Wiener { radius: f32, snr: f32 },
    Sharpen { weight: f32, radius: f32 },
    DiskBlur { radius: f32 },
    /// Per-pixel tone change, no kernel.
    Adjust {
        contrast: f32,
        brightness: f32,
        saturation: f32,
        exposure: f32,
    },
}

impl Default for MethodConfig {
    fn default() -> Self {
        MethodConfig::Fast {
            amount: 1.0,
            radius: 3.0,
            iterations: 5,
        }
    }
}

impl MethodConfig {
    /// Kernel radius, `None` for methods without a kernel.
    pub fn radius(&self) -> Option<f32> {
        match *self {
            MethodConfig::Fast { radius, .. }
            | MethodConfig::RichardsonLucy { radius, .. }
            | MethodConfig::Wiener { radius, .. }
            | MethodConfig::Sharpen { radius, .. }
            | MethodConfig::DiskBlur { radius } => Some(radius),
            MethodConfig::Adjust { .. } => None,
        }
    }

    /// Whether a GPU session can run this method.
    pub fn has_device_kernel(&self) -> bool {
        !matches!(self, MethodConfig::Wiener { .. } | MethodConfig::Adjust { .. })
    }

    /// Progress label shown while the operation runs.
    pub fn label(&self) -> &'static str {
        match self {
            MethodConfig::Fast { .. } | MethodConfig::RichardsonLucy { .. } | MethodConfig::Wiener { .. } => {
                "Deblurring"
            }
            MethodConfig::Sharpen { .. } => "Sharpening",
            MethodConfig::DiskBlur { .. } => "Blurring",
            MethodConfig::Adjust { .. } => "Adjusting",
        }
    }

    /// Iterative methods with zero iterations leave the image untouched.
    pub fn is_identity(&self) -> bool {
        matches!(
            self,
            MethodConfig::Fast { iterations: 0, .. } | MethodConfig::RichardsonLucy { iterations: 0, .. }
        )
    }
}

impl fmt::Display for MethodConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodConfig::Fast {
                amount,
                radius,
                iterations,
            } => write!(f, "Fast (amount={amount}, r={radius}, {iterations} iterations)"),
            MethodConfig::RichardsonLucy { radius, iterations } => {
                write!(f, "Richardson-Lucy (r={radius}, {iterations} iterations)")
            }
            MethodConfig::Wiener { radius, snr } => write!(f, "Wiener (r={radius}, snr={snr})"),
            MethodConfig::Sharpen { weight, radius } => write!(f, "Sharpen (weight={weight}, r={radius})"),
            MethodConfig::DiskBlur { radius } => write!(f, "Disk blur (r={radius})"),
            MethodConfig::Adjust {
                contrast,
                brightness,
                saturation,
                exposure,
            } => write!(
                f,
                "Adjust (contrast={contrast}, brightness={brightness}, saturation={saturation}, exposure={exposure})"
            ),
        }
    }
}

/// Empirical constants of the fast method.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FastTuning {
    pub inner_scale: f32,
}

impl Default for FastTuning {
    fn default() -> Self {
        Self {
            inner_scale: FAST_INNER_SCALE,
        }
    }
}

/// Top-level configuration, loadable from TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeblurConfig {
    #[serde(default)]
    pub device: DevicePreference,
    /// Worker threads for the CPU backend, 0 = one per core.
    #[serde(default)]
    pub threads: usize,
    #[serde(default)]
    pub method: MethodConfig,
    #[serde(default)]
    pub tuning: FastTuning,
}

impl fmt::Display for DeblurConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.method, self.device)?;
        if self.threads > 0 {
            write!(f, ", {} threads", self.threads)?;
        }
        Ok(())
    }
}
