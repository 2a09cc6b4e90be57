use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use deblur_core::io::load_raster;

#[derive(Args)]
pub struct CompareArgs {
    /// Reference image
    pub reference: PathBuf,

    /// Image to compare against the reference
    pub candidate: PathBuf,
}

pub fn run(args: &CompareArgs) -> Result<()> {
    let reference = load_raster(&args.reference)
        .with_context(|| format!("Failed to load {}", args.reference.display()))?;
    let candidate = load_raster(&args.candidate)
        .with_context(|| format!("Failed to load {}", args.candidate.display()))?;

    let nrmse = reference
        .normalized_rmse(&candidate)
        .context("Images must have the same size")?;
    println!("NRMSE: {nrmse:.4}");

    Ok(())
}
