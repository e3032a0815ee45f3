//! Progress-reporting collaborator interface
//!
//! The UI layer is out of scope; the solver only talks to this trait.

use tracing::info;

/// Receives run-progress notifications
pub trait ProgressReporter: Send {
    /// Announce what is being worked on
    fn set_progress_information(&mut self, label: &str);

    /// Update the completion percentage
    fn set_progress(&mut self, percent: f64);

    /// Tear down the progress display
    fn close_progress_information(&mut self);
}

/// Logs progress through `tracing`
#[derive(Debug, Default)]
pub struct TracingProgress {
    last_percent: i64,
}

impl ProgressReporter for TracingProgress {
    fn set_progress_information(&mut self, label: &str) {
        info!(label, "progress");
        self.last_percent = -1;
    }

    fn set_progress(&mut self, percent: f64) {
        let rounded = percent.round() as i64;
        if rounded != self.last_percent {
            info!(percent = rounded, "progress");
            self.last_percent = rounded;
        }
    }

    fn close_progress_information(&mut self) {
        info!("progress closed");
    }
}

/// Discards every notification; used by test fixtures
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn set_progress_information(&mut self, _label: &str) {}

    fn set_progress(&mut self, _percent: f64) {}

    fn close_progress_information(&mut self) {}
}
