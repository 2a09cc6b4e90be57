use deblur_core::pipeline::types::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal progress bar fed by the engine's progress reports.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> anyhow::Result<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:20} [{bar:40}] {pos}%")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl ProgressSink for BarProgress {
    fn set_label(&self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn update(&self, fraction: f64) {
        self.bar.set_position((fraction * 100.0) as u64);
    }
}
