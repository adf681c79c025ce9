//! Message types for the query coordinator

use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::QueryError;
use crate::refresh::RefreshPhase;

/// Reply channel for an awaitable run
pub(crate) type RunReply = oneshot::Sender<Result<RunOutcome, QueryError>>;

/// Per-invocation options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Emit `on_loading_change` for this run
    pub change_loading: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { change_loading: true }
    }
}

impl RunOptions {
    /// Run without touching the primary loading signal
    pub fn quiet() -> Self {
        Self { change_loading: false }
    }
}

/// How an awaitable run finished when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The result was delivered to `on_result_received`
    Delivered { generation: u64 },

    /// `should_skip_query` suppressed the run
    Skipped,
}

/// Snapshot of a coordinator's internal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub id: Uuid,
    pub generation: u64,
    pub in_flight: bool,
    pub loading: bool,
    pub debouncing: bool,
    pub consecutive_connection_errors: u32,
    pub refresh_phase: Option<RefreshPhase>,
}

/// Requests from handles to the coordinator task
pub(crate) enum Command<P> {
    SetParams(P),

    Run { options: RunOptions, reply: Option<RunReply> },

    SetAutoRefresh(bool),

    Status(oneshot::Sender<CoordinatorStatus>),

    Shutdown,
}

/// Notifications from runners and timers back to the coordinator task
pub(crate) enum Event<R> {
    DebounceElapsed { ticket: u64 },

    Settled { generation: u64, outcome: eyre::Result<R> },

    RefreshDue { ticket: u64 },
}
