//! Ticketed one-shot timers

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// A pending one-shot timer. Dropping it cancels the timer.
///
/// Each timer carries the ticket it was armed with so the owner can tell a
/// stale firing from the one it is waiting for.
#[derive(Debug)]
pub(crate) struct TimerHandle {
    ticket: u64,
    handle: JoinHandle<()>,
}

impl TimerHandle {
    /// Arm a timer that calls `fire(ticket)` after `delay`
    pub(crate) fn spawn<F>(ticket: u64, delay: Duration, fire: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        debug!(%ticket, ?delay, "TimerHandle::spawn: called");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(ticket);
        });
        Self { ticket, handle }
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
