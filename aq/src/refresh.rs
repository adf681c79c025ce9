//! Auto-refresh scheduling
//!
//! The refresh interval is measured from the completion of the previous run,
//! so a slow query shifts the schedule instead of overlapping with it.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::timer::TimerHandle;

/// Default auto-refresh cadence
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Phase of the auto-refresh state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPhase {
    Disabled,
    Idle,
    Scheduled,
    Refreshing,
}

/// Why a run was started; only refresh runs are treated specially
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrigin {
    Mount,
    ParamsChanged,
    Debounced,
    Manual,
    Refresh,
}

/// Auto-refresh timer state owned by one coordinator
#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    phase: RefreshPhase,
    timer: Option<TimerHandle>,
    next_ticket: u64,
}

impl RefreshScheduler {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        debug!(?interval, %enabled, "RefreshScheduler::new: called");
        Self {
            interval,
            phase: if enabled { RefreshPhase::Idle } else { RefreshPhase::Disabled },
            timer: None,
            next_ticket: 0,
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        self.phase
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Toggle auto-refresh; true when a run should start right away
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        debug!(%enabled, phase = ?self.phase, "RefreshScheduler::set_enabled: called");
        match (enabled, self.phase) {
            (true, RefreshPhase::Disabled) => {
                self.phase = RefreshPhase::Idle;
                true
            }
            (false, RefreshPhase::Disabled) => false,
            (false, _) => {
                self.timer = None;
                self.phase = RefreshPhase::Disabled;
                false
            }
            (true, _) => false,
        }
    }

    /// A run is starting; a scheduled refresh is no longer needed
    pub fn on_run_started(&mut self, origin: RunOrigin) {
        if self.phase == RefreshPhase::Disabled {
            return;
        }
        if self.timer.take().is_some() {
            debug!(?origin, "RefreshScheduler::on_run_started: cancelling scheduled refresh");
        }
        self.phase = if origin == RunOrigin::Refresh {
            RefreshPhase::Refreshing
        } else {
            RefreshPhase::Idle
        };
    }

    /// The current run settled; arm the next refresh if still enabled
    pub fn on_run_settled<F>(&mut self, fire: F) -> Option<u64>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        if self.phase == RefreshPhase::Disabled {
            debug!("RefreshScheduler::on_run_settled: disabled, not re-arming");
            return None;
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.timer = Some(TimerHandle::spawn(ticket, self.interval, fire));
        self.phase = RefreshPhase::Scheduled;
        Some(ticket)
    }

    /// Timer fired; true when the refresh should run
    pub fn on_timer_fired(&mut self, ticket: u64) -> bool {
        let current = self.timer.as_ref().map(|t| t.ticket());
        if self.phase != RefreshPhase::Scheduled || current != Some(ticket) {
            debug!(%ticket, ?current, phase = ?self.phase, "RefreshScheduler::on_timer_fired: stale, ignoring");
            return false;
        }
        self.timer = None;
        self.phase = RefreshPhase::Refreshing;
        true
    }

    /// Coordinator disposed
    pub fn teardown(&mut self) {
        self.timer = None;
    }
}
