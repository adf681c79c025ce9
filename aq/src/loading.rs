//! Loading state arbitration
//!
//! Loading is set on start and cleared only when the current generation
//! succeeds. A failed or superseded run never clears it: if run A is replaced
//! by run B, A settling must not overwrite B's loading=true.

use tracing::debug;

#[derive(Debug, Default)]
pub struct LoadingArbiter {
    loading: bool,
}

impl LoadingArbiter {
    /// Returns the value to emit, if any
    pub fn on_task_started(&mut self, change_loading: bool) -> Option<bool> {
        if !change_loading {
            return None;
        }
        debug!("LoadingArbiter::on_task_started: loading=true");
        self.loading = true;
        Some(true)
    }

    /// Returns the value to emit, if any
    pub fn on_task_succeeded(&mut self, change_loading: bool) -> Option<bool> {
        if !change_loading {
            return None;
        }
        debug!("LoadingArbiter::on_task_succeeded: loading=false");
        self.loading = false;
        Some(false)
    }

    /// Failures leave loading untouched
    pub fn on_task_failed(&self) {
        debug!(loading = self.loading, "LoadingArbiter::on_task_failed: leaving loading as is");
    }

    /// Last value emitted
    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
