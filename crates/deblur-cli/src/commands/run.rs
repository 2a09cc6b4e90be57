use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use deblur_core::compute::DevicePreference;
use deblur_core::io::{load_raster, save_raster};
use deblur_core::pipeline::config::{DeblurConfig, FastTuning, MethodConfig};
use deblur_core::pipeline::dispatcher::Dispatcher;
use deblur_core::pipeline::types::{CancelToken, JobContext};
use tracing::{debug, warn};

use crate::progress::BarProgress;

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Fast,
    Rl,
    Wiener,
    Sharpen,
    Blur,
    Adjust,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DeviceArg {
    Auto,
    Cpu,
    Gpu,
    GpuRaster,
}

impl From<DeviceArg> for DevicePreference {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Auto => DevicePreference::Auto,
            DeviceArg::Cpu => DevicePreference::Cpu,
            DeviceArg::Gpu => DevicePreference::GpuCompute,
            DeviceArg::GpuRaster => DevicePreference::GpuRaster,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Input image file (PNG, JPEG or TIFF)
    pub file: PathBuf,

    /// Config file (TOML); replaces the method and device options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Operation to apply
    #[arg(long, value_enum, default_value = "fast")]
    pub method: MethodArg,

    /// Blur radius in pixels
    #[arg(long, default_value = "3.0")]
    pub radius: f32,

    /// Fast method strength
    #[arg(long, default_value = "1.0")]
    pub amount: f32,

    /// Iteration count for fast and Richardson-Lucy
    #[arg(long, default_value = "5")]
    pub iterations: usize,

    /// Wiener signal-to-noise ratio
    #[arg(long, default_value = "1000")]
    pub snr: f32,

    /// Sharpen weight
    #[arg(long, default_value = "1.0")]
    pub weight: f32,

    /// Contrast steps for adjust (gain 1.03^contrast)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub contrast: f32,

    /// Brightness offset for adjust
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub brightness: f32,

    /// Saturation for adjust (1 = unchanged)
    #[arg(long, default_value = "1.0")]
    pub saturation: f32,

    /// Exposure for adjust (1 = unchanged)
    #[arg(long, default_value = "1.0")]
    pub exposure: f32,

    /// Compute device
    #[arg(long, value_enum, default_value = "auto")]
    pub device: DeviceArg,

    /// Worker threads for the CPU backend (0 = all cores)
    #[arg(long, default_value = "0")]
    pub threads: usize,

    /// Output file path
    #[arg(short, long, default_value = "deblurred.png")]
    pub output: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        let config: DeblurConfig = toml::from_str(&contents).context("Invalid deblur config")?;
        debug!(path = %config_path.display(), %config, "Loaded config");
        config
    } else {
        build_config_from_args(args)
    };

    let input = load_raster(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    let mut dispatcher = Dispatcher::from_config(&config)?;
    crate::summary::print_run_summary(
        &config,
        &args.file,
        &args.output,
        input.dims(),
        &dispatcher.backend().name(),
    );

    let bar = Arc::new(BarProgress::new()?);
    let ctx = JobContext::new(bar.clone(), CancelToken::new());
    let Some(result) = dispatcher.run(&config.method, &input, &ctx)? else {
        bar.finish("Canceled");
        warn!(method = %config.method, "Run canceled, no output written");
        bail!("Operation canceled");
    };
    bar.finish("Done");

    save_raster(&result, &args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    println!("\nOutput saved to {}", args.output.display());

    Ok(())
}

fn build_config_from_args(args: &RunArgs) -> DeblurConfig {
    let method = match args.method {
        MethodArg::Fast => MethodConfig::Fast {
            amount: args.amount,
            radius: args.radius,
            iterations: args.iterations,
        },
        MethodArg::Rl => MethodConfig::RichardsonLucy {
            radius: args.radius,
            iterations: args.iterations,
        },
        MethodArg::Wiener => MethodConfig::Wiener {
            radius: args.radius,
            snr: args.snr,
        },
        MethodArg::Sharpen => MethodConfig::Sharpen {
            weight: args.weight,
            radius: args.radius,
        },
        MethodArg::Blur => MethodConfig::DiskBlur {
            radius: args.radius,
        },
        MethodArg::Adjust => MethodConfig::Adjust {
            contrast: args.contrast,
            brightness: args.brightness,
            saturation: args.saturation,
            exposure: args.exposure,
        },
    };

    DeblurConfig {
        device: args.device.into(),
        threads: args.threads,
        method,
        tuning: FastTuning::default(),
    }
}
