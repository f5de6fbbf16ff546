use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trait for reporting progress and status to whatever front end drives the library.
///
/// The CLI implements it with indicatif; tests use `SilentReporter` or a recorder.
/// Reporting is advisory: implementations must return promptly and never fail.
pub trait ProgressReporter: Send + Sync {
    /// Percentage in `0.0..=100.0`, rounded to two decimals.
    fn on_progress(&self, _percent: f64) {}
    /// Single status line; every reported failure lands here as well.
    fn on_status(&self, _message: &str) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Round `done / total` to a two-decimal percentage. A zero total reports 100.
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let raw = (done as f64 / total as f64) * 100.0;
    (raw.min(100.0) * 100.0).round() / 100.0
}

/// Cooperative cancellation flag checked between per-entry iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
