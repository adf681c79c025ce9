//! Main coordinator task implementation

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::QueryOptions;
use super::handle::CoordinatorHandle;
use super::messages::{Command, CoordinatorStatus, Event, RunOptions, RunOutcome, RunReply};
use crate::debounce::{DebounceDecision, DebounceGate, decide};
use crate::error::QueryError;
use crate::escalation::ErrorEscalator;
use crate::generation::{GenerationTracker, QueryRequest};
use crate::loading::LoadingArbiter;
use crate::query::{Query, run_guarded};
use crate::refresh::{RefreshScheduler, RunOrigin};

/// What the coordinator remembers about the run in flight
struct RunMeta {
    origin: RunOrigin,
    change_loading: bool,
    reply: Option<RunReply>,
}

/// Coordinates one parameterized query: debouncing, superseding stale runs,
/// loading arbitration, error escalation and auto-refresh.
///
/// All state lives in the task started by [`QueryCoordinator::run`]; callers
/// interact through [`CoordinatorHandle`].
pub struct QueryCoordinator<P, R> {
    id: Uuid,
    options: QueryOptions<P, R>,
    params: P,
    tx: mpsc::UnboundedSender<Command<P>>,
    rx: mpsc::UnboundedReceiver<Command<P>>,
}

impl<P, R> QueryCoordinator<P, R>
where
    P: Clone + PartialEq + Send + 'static,
    R: Send + 'static,
{
    /// Create a coordinator for `params`; nothing runs until [`run`](Self::run)
    pub fn new(params: P, options: QueryOptions<P, R>) -> Self {
        let id = Uuid::now_v7();
        debug!(%id, ?options, "QueryCoordinator::new: called");
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            id,
            options,
            params,
            tx,
            rx,
        }
    }

    /// Create a coordinator, start it on the runtime and return its handle
    pub fn spawn(params: P, options: QueryOptions<P, R>) -> CoordinatorHandle<P> {
        let coordinator = Self::new(params, options);
        let handle = coordinator.handle();
        tokio::spawn(coordinator.run());
        handle
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get a handle for driving this coordinator
    pub fn handle(&self) -> CoordinatorHandle<P> {
        CoordinatorHandle::new(self.tx.clone(), self.id)
    }

    /// Run the coordinator task
    ///
    /// Performs the initial query, then processes requests until shutdown is
    /// requested or every handle is dropped.
    pub async fn run(self) {
        let QueryCoordinator {
            id,
            options,
            params,
            tx,
            mut rx,
        } = self;
        // Only handles keep the request channel open
        drop(tx);

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut state = CoordinatorState::new(id, options, params, events_tx);

        info!(%id, "Query coordinator started");
        state.mount();

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => state.handle_command(command),
                },
                Some(event) = events_rx.recv() => state.handle_event(event),
            }
        }

        state.teardown();
        info!(%id, "Query coordinator stopped");
    }
}

impl<R> QueryCoordinator<(), R>
where
    R: Send + 'static,
{
    /// Spawn a coordinator for a query that takes no parameters
    pub fn spawn_parameterless(options: QueryOptions<(), R>) -> CoordinatorHandle<()> {
        Self::spawn((), options.should_query_immediately(|_, _| true))
    }
}

/// State owned by the coordinator task
struct CoordinatorState<P, R> {
    id: Uuid,
    options: QueryOptions<P, R>,
    params: P,
    tracker: GenerationTracker<RunMeta>,
    debounce: DebounceGate,
    loading: LoadingArbiter,
    escalator: ErrorEscalator,
    refresh: Option<RefreshScheduler>,
    events: mpsc::UnboundedSender<Event<R>>,
}

impl<P, R> CoordinatorState<P, R>
where
    P: Clone + PartialEq + Send + 'static,
    R: Send + 'static,
{
    fn new(id: Uuid, options: QueryOptions<P, R>, params: P, events: mpsc::UnboundedSender<Event<R>>) -> Self {
        let escalator = ErrorEscalator::new(
            options.connection_error_threshold,
            Arc::clone(&options.is_connection_error),
            Arc::clone(&options.on_connection_error),
            Arc::clone(&options.on_error),
        );
        let refresh = options
            .auto_refresh
            .then(|| RefreshScheduler::new(options.refresh_interval, options.enable_auto_refresh));

        Self {
            id,
            tracker: GenerationTracker::new(options.abort_superseded),
            debounce: DebounceGate::default(),
            loading: LoadingArbiter::default(),
            escalator,
            refresh,
            events,
            options,
            params,
        }
    }

    /// Initial invocation; the first run never waits for the debounce delay
    fn mount(&mut self) {
        debug!(id = %self.id, "QueryCoordinator::mount: called");
        self.start_run(RunOrigin::Mount, RunOptions::default(), None);
    }

    fn handle_command(&mut self, command: Command<P>) {
        match command {
            Command::SetParams(params) => self.set_params(params),
            Command::Run { options, reply } => self.start_run(RunOrigin::Manual, options, reply),
            Command::SetAutoRefresh(enabled) => self.set_auto_refresh(enabled),
            Command::Status(reply_tx) => {
                let _ = reply_tx.send(self.status());
            }
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: Event<R>) {
        match event {
            Event::DebounceElapsed { ticket } => {
                if self.debounce.elapsed(ticket) {
                    debug!(id = %self.id, %ticket, "QueryCoordinator::handle_event: debounce elapsed");
                    self.start_run(RunOrigin::Debounced, RunOptions::default(), None);
                }
            }
            Event::Settled { generation, outcome } => self.settle(generation, outcome),
            Event::RefreshDue { ticket } => self.refresh_due(ticket),
        }
    }

    fn set_params(&mut self, params: P) {
        if params == self.params {
            debug!(id = %self.id, "QueryCoordinator::set_params: params unchanged, ignoring");
            return;
        }

        // Only the delay is abandoned; a run it already started keeps going
        self.debounce.cancel();
        let prev = std::mem::replace(&mut self.params, params);

        let decision = decide(
            Some(&prev),
            &self.params,
            self.options.should_query_immediately.as_ref(),
            self.options.debounce_delay,
        );
        debug!(id = %self.id, ?decision, "QueryCoordinator::set_params: called");

        match decision {
            DebounceDecision::Immediate => self.start_run(RunOrigin::ParamsChanged, RunOptions::default(), None),
            DebounceDecision::Delayed(delay) => {
                let events = self.events.clone();
                self.debounce.schedule(delay, move |ticket| {
                    let _ = events.send(Event::DebounceElapsed { ticket });
                });
            }
        }
    }

    fn start_run(&mut self, origin: RunOrigin, options: RunOptions, reply: Option<RunReply>) {
        if (self.options.should_skip_query)(&self.params) {
            debug!(id = %self.id, ?origin, "QueryCoordinator::start_run: skipped");
            if let Some(reply) = reply {
                let _ = reply.send(Ok(RunOutcome::Skipped));
            }
            if origin == RunOrigin::Refresh {
                (self.options.on_refreshing_change)(false);
                self.arm_refresh();
            }
            return;
        }

        (self.options.on_query_started)();
        if let Some(loading) = self.loading.on_task_started(options.change_loading) {
            (self.options.on_loading_change)(loading);
        }
        if let Some(refresh) = &mut self.refresh {
            refresh.on_run_started(origin);
        }

        let meta = RunMeta {
            origin,
            change_loading: options.change_loading,
            reply,
        };
        let params = self.params.clone();
        let query = Arc::clone(&self.options.query);
        let events = self.events.clone();
        let (generation, superseded) = self.tracker.start(meta, |generation| {
            Some(spawn_runner(query, QueryRequest { params, generation }, events))
        });
        debug!(id = %self.id, %generation, ?origin, "QueryCoordinator::start_run: started");

        if let Some(previous) = superseded
            && let Some(reply) = previous.meta.reply
        {
            let _ = reply.send(Err(QueryError::Superseded {
                generation: previous.generation,
            }));
        }
    }

    fn settle(&mut self, generation: u64, outcome: eyre::Result<R>) {
        if !self.tracker.is_current(generation) {
            debug!(
                id = %self.id,
                %generation,
                latest = self.tracker.latest(),
                "QueryCoordinator::settle: stale, discarding"
            );
            return;
        }
        let Some(task) = self.tracker.finish(generation) else {
            debug!(id = %self.id, %generation, "QueryCoordinator::settle: no active task");
            return;
        };
        let RunMeta {
            origin,
            change_loading,
            reply,
        } = task.meta;

        match outcome {
            Ok(result) => {
                debug!(id = %self.id, %generation, ?origin, "QueryCoordinator::settle: delivering result");
                (self.options.on_result_received)(result);
                if let Some(loading) = self.loading.on_task_succeeded(change_loading) {
                    (self.options.on_loading_change)(loading);
                }
                self.escalator.record_success();
                if origin == RunOrigin::Refresh {
                    (self.options.on_refreshing_change)(false);
                }
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(RunOutcome::Delivered { generation }));
                }
            }
            Err(err) => {
                self.loading.on_task_failed();
                match reply {
                    Some(reply) => {
                        debug!(id = %self.id, %generation, "QueryCoordinator::settle: returning failure to caller");
                        let _ = reply.send(Err(QueryError::Failed(err)));
                    }
                    None => {
                        warn!(id = %self.id, %generation, ?origin, error = %err, "Query failed");
                        self.escalator.handle(&err);
                    }
                }
            }
        }

        self.arm_refresh();
    }

    fn arm_refresh(&mut self) {
        let events = self.events.clone();
        if let Some(refresh) = &mut self.refresh
            && let Some(ticket) = refresh.on_run_settled(move |ticket| {
                let _ = events.send(Event::RefreshDue { ticket });
            })
        {
            debug!(id = %self.id, %ticket, interval = ?refresh.interval(), "QueryCoordinator::arm_refresh: scheduled");
        }
    }

    fn refresh_due(&mut self, ticket: u64) {
        let Some(refresh) = &mut self.refresh else {
            return;
        };
        if !refresh.on_timer_fired(ticket) {
            return;
        }
        debug!(id = %self.id, %ticket, "QueryCoordinator::refresh_due: refreshing");
        (self.options.on_refreshing_change)(true);
        self.start_run(RunOrigin::Refresh, RunOptions::quiet(), None);
    }

    fn set_auto_refresh(&mut self, enabled: bool) {
        let Some(refresh) = &mut self.refresh else {
            warn!(id = %self.id, "Auto-refresh is not configured for this coordinator");
            return;
        };
        if refresh.set_enabled(enabled) {
            info!(id = %self.id, "Auto-refresh re-enabled, querying now");
            self.start_run(RunOrigin::Manual, RunOptions::default(), None);
        }
    }

    fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            id: self.id,
            generation: self.tracker.latest(),
            in_flight: self.tracker.in_flight(),
            loading: self.loading.is_loading(),
            debouncing: self.debounce.is_pending(),
            consecutive_connection_errors: self.escalator.consecutive_connection_errors(),
            refresh_phase: self.refresh.as_ref().map(|r| r.phase()),
        }
    }

    fn teardown(&mut self) {
        debug!(id = %self.id, "QueryCoordinator::teardown: called");
        self.debounce.cancel();
        if let Some(refresh) = &mut self.refresh {
            refresh.teardown();
        }
        if let Some(task) = self.tracker.cancel_active()
            && let Some(reply) = task.meta.reply
        {
            let _ = reply.send(Err(QueryError::Shutdown));
        }
    }
}

/// Start the query on its own task; the outcome is reported with its generation
fn spawn_runner<P, R>(
    query: Arc<dyn Query<P, Output = R>>,
    request: QueryRequest<P>,
    events: mpsc::UnboundedSender<Event<R>>,
) -> AbortHandle
where
    P: Send + 'static,
    R: Send + 'static,
{
    let task = tokio::spawn(async move {
        let QueryRequest { params, generation } = request;
        let outcome = run_guarded(query.as_ref(), params).await;
        let _ = events.send(Event::Settled { generation, outcome });
    });
    task.abort_handle()
}
