//! Failure classification and connection-error escalation

use std::sync::Arc;

use tracing::{debug, warn};

/// Predicate deciding whether a failure means the backend is unreachable
pub type ErrorPredicate = Arc<dyn Fn(&eyre::Report) -> bool + Send + Sync>;

/// Callback receiving a handled failure
pub type ErrorCallback = Arc<dyn Fn(&eyre::Report) + Send + Sync>;

/// Classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Counted, escalated once the consecutive threshold is reached
    Connection,

    /// Surfaced immediately through the generic error callback
    Other,
}

/// Consecutive connection-error bookkeeping.
///
/// Starts at `threshold - 1` so a failure on the very first run escalates
/// right away instead of waiting for `threshold` failures from a cold start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionErrorCounter {
    consecutive: u32,
    threshold: u32,
}

impl ConnectionErrorCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: threshold.saturating_sub(1),
            threshold,
        }
    }

    /// Record a connection error; true when escalation is due
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive >= self.threshold
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

/// Routes handled failures to the escalation or generic error callback
pub struct ErrorEscalator {
    counter: ConnectionErrorCounter,
    is_connection_error: ErrorPredicate,
    on_connection_error: Arc<dyn Fn() + Send + Sync>,
    on_error: ErrorCallback,
}

impl ErrorEscalator {
    pub fn new(
        threshold: u32,
        is_connection_error: ErrorPredicate,
        on_connection_error: Arc<dyn Fn() + Send + Sync>,
        on_error: ErrorCallback,
    ) -> Self {
        debug!(%threshold, "ErrorEscalator::new: called");
        Self {
            counter: ConnectionErrorCounter::new(threshold),
            is_connection_error,
            on_connection_error,
            on_error,
        }
    }

    pub fn classify(&self, err: &eyre::Report) -> ErrorClass {
        if (self.is_connection_error)(err) {
            ErrorClass::Connection
        } else {
            ErrorClass::Other
        }
    }

    /// Handle a failure from the current generation
    pub fn handle(&mut self, err: &eyre::Report) -> ErrorClass {
        let class = self.classify(err);
        match class {
            ErrorClass::Connection => {
                let escalate = self.counter.record_failure();
                debug!(
                    consecutive = self.counter.consecutive(),
                    threshold = self.counter.threshold(),
                    escalate,
                    "ErrorEscalator::handle: connection error"
                );
                if escalate {
                    warn!(consecutive = self.counter.consecutive(), "Connection error threshold reached");
                    (self.on_connection_error)();
                }
            }
            ErrorClass::Other => {
                debug!(error = %err, "ErrorEscalator::handle: other error");
                (self.on_error)(err);
            }
        }
        class
    }

    /// A run succeeded somewhere in the coordinator
    pub fn record_success(&mut self) {
        if self.counter.consecutive() != 0 {
            debug!(previous = self.counter.consecutive(), "ErrorEscalator::record_success: resetting counter");
        }
        self.counter.reset();
    }

    pub fn consecutive_connection_errors(&self) -> u32 {
        self.counter.consecutive()
    }
}
