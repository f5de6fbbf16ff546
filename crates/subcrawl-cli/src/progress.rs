use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use subcrawl_core::ProgressReporter;

/// Percent-driven indicatif bar. Status lines are printed above the bar.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    pub fn start(&self, label: &str) {
        let pb = ProgressBar::new(10_000);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} {prefix} [{bar:30.cyan/dim}] {msg}",
        ) {
            pb.set_style(
                style
                    .progress_chars("━╸─")
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
        }
        pb.set_prefix(label.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    pub fn finish(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_progress(&self, percent: f64) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position((percent * 100.0) as u64);
                pb.set_message(format!("{:.2}%", percent));
            }
        }
    }

    fn on_status(&self, message: &str) {
        match self.bar.lock().ok().as_deref().and_then(Option::as_ref) {
            Some(pb) => pb.println(format!("  {}", message)),
            None => eprintln!("  {}", message),
        }
    }
}
