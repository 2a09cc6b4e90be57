mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deblur", about = "Deblurring and deconvolution for RGB images")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deblur, sharpen or blur an image
    Run(commands::run::RunArgs),
    /// Print or save a default config as TOML
    Config(commands::config::ConfigArgs),
    /// Show the kernel geometry for a radius
    Kernel(commands::kernel::KernelArgs),
    /// Normalized RMS difference between two images
    Compare(commands::compare::CompareArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Kernel(args) => commands::kernel::run(args),
        Commands::Compare(args) => commands::compare::run(args),
    }
}
