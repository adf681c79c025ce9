//! Task generation tracking
//!
//! Every run gets a generation id. Exactly one run is current at a time;
//! starting a new one supersedes the previous, and a completion is only acted
//! on when its generation is still current.

use tokio::task::AbortHandle;
use tracing::debug;

/// Immutable snapshot handed to a query runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest<P> {
    pub params: P,
    pub generation: u64,
}

/// The run currently owned by a coordinator
#[derive(Debug)]
pub struct ActiveTask<M> {
    pub generation: u64,
    cancel: Option<AbortHandle>,
    pub meta: M,
}

impl<M> ActiveTask<M> {
    /// Best-effort cancellation of the underlying operation
    fn cancel(&self) {
        if let Some(cancel) = &self.cancel {
            debug!(generation = self.generation, "ActiveTask::cancel: aborting runner");
            cancel.abort();
        }
    }
}

/// Single-slot owner of the current run
#[derive(Debug)]
pub struct GenerationTracker<M> {
    latest: u64,
    active: Option<ActiveTask<M>>,
    abort_superseded: bool,
}

impl<M> GenerationTracker<M> {
    pub fn new(abort_superseded: bool) -> Self {
        Self {
            latest: 0,
            active: None,
            abort_superseded,
        }
    }

    /// Start a new generation.
    ///
    /// `runner` is invoked with the new generation id and may return a handle
    /// used to abort it later. Returns the new generation and the superseded
    /// task, if one was still in flight.
    pub fn start<F>(&mut self, meta: M, runner: F) -> (u64, Option<ActiveTask<M>>)
    where
        F: FnOnce(u64) -> Option<AbortHandle>,
    {
        self.latest += 1;
        let generation = self.latest;
        debug!(%generation, "GenerationTracker::start: called");

        let superseded = self.active.take();
        if let Some(previous) = &superseded {
            debug!(previous = previous.generation, %generation, "GenerationTracker::start: superseding");
            if self.abort_superseded {
                previous.cancel();
            }
        }

        let cancel = runner(generation);
        self.active = Some(ActiveTask {
            generation,
            cancel,
            meta,
        });
        (generation, superseded)
    }

    /// Whether `generation` is still the most recent one
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest
    }

    /// Take the active task if `generation` is the one in flight
    pub fn finish(&mut self, generation: u64) -> Option<ActiveTask<M>> {
        match &self.active {
            Some(task) if task.generation == generation => self.active.take(),
            _ => None,
        }
    }

    /// Cancel and take whatever is in flight
    pub fn cancel_active(&mut self) -> Option<ActiveTask<M>> {
        let task = self.active.take();
        if let Some(task) = &task {
            task.cancel();
        }
        task
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }

    pub fn in_flight(&self) -> bool {
        self.active.is_some()
    }
}
