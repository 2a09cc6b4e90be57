use std::path::Path;

use console::Style;
use deblur_core::pipeline::config::{DeblurConfig, MethodConfig};

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    method: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(
    config: &DeblurConfig,
    input: &Path,
    output: &Path,
    (width, height): (usize, usize),
    backend_name: &str,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Deblur"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!("{width}x{height}"))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Device"),
        s.method.apply_to(backend_name)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(&config.method)
    );
    if config.threads > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Threads"),
            s.value.apply_to(config.threads)
        );
    }
    if let MethodConfig::Fast { .. } = config.method {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Inner scale"),
            s.value.apply_to(config.tuning.inner_scale)
        );
    }
    println!();
}
