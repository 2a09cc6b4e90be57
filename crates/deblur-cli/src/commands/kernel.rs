use anyhow::Result;
use clap::{Args, ValueEnum};
use deblur_core::kernel::{disk_weights, ring_offsets, ring_offsets_quarter, DiskProfile, KernelOffsetSet};

#[derive(Clone, Copy, ValueEnum)]
pub enum ShapeArg {
    /// Full-density circle outline
    Ring,
    /// Circle outline sampled every fourth step
    Quarter,
    /// Binary disk with rim cells, used by the disk blur
    Disk,
    /// Binary disk without rim cells, used by Richardson-Lucy and Wiener
    OpenDisk,
    /// Graded disk used by sharpening
    Graded,
}

#[derive(Args)]
pub struct KernelArgs {
    /// Kernel radius in pixels
    pub radius: f32,

    /// Kernel shape
    #[arg(long, value_enum, default_value = "ring")]
    pub shape: ShapeArg,
}

pub fn run(args: &KernelArgs) -> Result<()> {
    match args.shape {
        ShapeArg::Ring => print_ring(&ring_offsets(args.radius)?),
        ShapeArg::Quarter => print_ring(&ring_offsets_quarter(args.radius)?),
        ShapeArg::Disk => print_disk(args.radius, DiskProfile::BinaryClosed)?,
        ShapeArg::OpenDisk => print_disk(args.radius, DiskProfile::Binary)?,
        ShapeArg::Graded => print_disk(args.radius, DiskProfile::Graded)?,
    }
    Ok(())
}

fn print_ring(ring: &KernelOffsetSet) {
    let extent = ring.extent();
    println!("{} offsets, extent {}", ring.len(), extent);
    for dy in -extent..=extent {
        let row: String = (-extent..=extent)
            .map(|dx| {
                if (dx, dy) == (0, 0) {
                    '+'
                } else if ring.offsets().contains(&(dx, dy)) {
                    '#'
                } else {
                    '.'
                }
            })
            .collect();
        println!("  {row}");
    }
}

fn print_disk(radius: f32, profile: DiskProfile) -> Result<()> {
    let matrix = disk_weights(radius, profile)?;
    let half = matrix.half_width() as isize;
    println!(
        "{0}x{0} matrix, total weight {1:.3}",
        matrix.size(),
        matrix.total()
    );
    for dy in -half..=half {
        let row: Vec<String> = (-half..=half)
            .map(|dx| format!("{:.2}", matrix.weight(dx, dy)))
            .collect();
        println!("  {}", row.join(" "));
    }
    Ok(())
}
