//! Debounce gate

use std::time::Duration;

use tracing::debug;

use crate::timer::TimerHandle;

/// Default delay before a debounced run executes
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Whether a parameter change runs now or after the debounce delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
    Immediate,
    Delayed(Duration),
}

/// Decide how to react to a parameter change.
///
/// The first invocation (`prev` absent) always runs immediately.
pub fn decide<P, F>(prev: Option<&P>, cur: &P, should_run_immediately: F, delay: Duration) -> DebounceDecision
where
    F: FnOnce(&P, &P) -> bool,
{
    match prev {
        None => DebounceDecision::Immediate,
        Some(prev) if should_run_immediately(prev, cur) => DebounceDecision::Immediate,
        Some(_) => DebounceDecision::Delayed(delay),
    }
}

/// Owns the single pending debounce delay of a coordinator
#[derive(Debug, Default)]
pub(crate) struct DebounceGate {
    pending: Option<TimerHandle>,
    next_ticket: u64,
}

impl DebounceGate {
    /// Start a delay, abandoning any delay already pending
    pub(crate) fn schedule<F>(&mut self, delay: Duration, fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        debug!(%ticket, ?delay, "DebounceGate::schedule: called");
        self.pending = Some(TimerHandle::spawn(ticket, delay, fire));
        ticket
    }

    /// Abandon the pending delay. A run it already started is unaffected.
    pub(crate) fn cancel(&mut self) {
        if let Some(timer) = self.pending.take() {
            debug!(ticket = timer.ticket(), "DebounceGate::cancel: abandoning pending delay");
        }
    }

    /// Consume an elapsed delay; false when the firing is stale
    pub(crate) fn elapsed(&mut self, ticket: u64) -> bool {
        match &self.pending {
            Some(timer) if timer.ticket() == ticket => {
                self.pending = None;
                true
            }
            _ => {
                debug!(%ticket, "DebounceGate::elapsed: stale ticket, ignoring");
                false
            }
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
