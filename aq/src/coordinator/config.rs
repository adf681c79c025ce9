//! Per-coordinator options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::config::Config;
use crate::escalation::{ErrorCallback, ErrorPredicate};
use crate::query::Query;

/// Caller-supplied configuration for one coordinator.
///
/// Only the query and the result callback are required; everything else has
/// a default taken from [`Config`].
pub struct QueryOptions<P, R> {
    pub(crate) query: Arc<dyn Query<P, Output = R>>,
    pub(crate) should_query_immediately: Arc<dyn Fn(&P, &P) -> bool + Send + Sync>,
    pub(crate) should_skip_query: Arc<dyn Fn(&P) -> bool + Send + Sync>,
    pub(crate) debounce_delay: Duration,
    pub(crate) abort_superseded: bool,

    pub(crate) on_result_received: Arc<dyn Fn(R) + Send + Sync>,
    pub(crate) on_loading_change: Arc<dyn Fn(bool) + Send + Sync>,
    pub(crate) on_query_started: Arc<dyn Fn() + Send + Sync>,
    pub(crate) on_error: ErrorCallback,

    pub(crate) auto_refresh: bool,
    pub(crate) refresh_interval: Duration,
    pub(crate) enable_auto_refresh: bool,
    pub(crate) on_refreshing_change: Arc<dyn Fn(bool) + Send + Sync>,

    pub(crate) is_connection_error: ErrorPredicate,
    pub(crate) connection_error_threshold: u32,
    pub(crate) on_connection_error: Arc<dyn Fn() + Send + Sync>,
}

impl<P, R> QueryOptions<P, R>
where
    P: 'static,
    R: Send + 'static,
{
    /// Options with built-in defaults
    pub fn new<Q, F>(query: Q, on_result_received: F) -> Self
    where
        Q: Query<P, Output = R>,
        F: Fn(R) + Send + Sync + 'static,
    {
        Self::from_config(&Config::default(), query, on_result_received)
    }

    /// Options seeded from a loaded [`Config`]
    pub fn from_config<Q, F>(config: &Config, query: Q, on_result_received: F) -> Self
    where
        Q: Query<P, Output = R>,
        F: Fn(R) + Send + Sync + 'static,
    {
        Self {
            query: Arc::new(query),
            should_query_immediately: Arc::new(|_: &P, _: &P| true),
            should_skip_query: Arc::new(|_: &P| false),
            debounce_delay: config.query.debounce_delay(),
            abort_superseded: config.query.abort_superseded,
            on_result_received: Arc::new(on_result_received),
            on_loading_change: Arc::new(|_: bool| {}),
            on_query_started: Arc::new(|| {}),
            on_error: Arc::new(|e: &eyre::Report| error!(error = %e, "Query failed")),
            auto_refresh: false,
            refresh_interval: config.refresh.interval(),
            enable_auto_refresh: config.refresh.enabled,
            on_refreshing_change: Arc::new(|_: bool| {}),
            is_connection_error: Arc::new(|_: &eyre::Report| false),
            connection_error_threshold: config.refresh.connection_error_threshold,
            on_connection_error: Arc::new(|| {}),
        }
    }

    /// Debounce policy: return false to delay the run after a parameter change
    pub fn should_query_immediately<F>(mut self, f: F) -> Self
    where
        F: Fn(&P, &P) -> bool + Send + Sync + 'static,
    {
        self.should_query_immediately = Arc::new(f);
        self
    }

    /// Suppress invocation entirely for these params
    pub fn should_skip_query<F>(mut self, f: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        self.should_skip_query = Arc::new(f);
        self
    }

    pub fn debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Abort the runner of a superseded query instead of only discarding its result
    pub fn abort_superseded(mut self, abort: bool) -> Self {
        self.abort_superseded = abort;
        self
    }

    pub fn on_loading_change<F>(mut self, f: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on_loading_change = Arc::new(f);
        self
    }

    pub fn on_query_started<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_query_started = Arc::new(f);
        self
    }

    /// Handler for failures that are not connection errors
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&eyre::Report) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(f);
        self
    }

    /// Repeat the query on a timer using the configured interval
    pub fn auto_refresh(mut self) -> Self {
        self.auto_refresh = true;
        self
    }

    /// Repeat the query on a timer every `interval`
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.auto_refresh = true;
        self.refresh_interval = interval;
        self
    }

    /// Initial auto-refresh state
    pub fn enable_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = true;
        self.enable_auto_refresh = enabled;
        self
    }

    /// Secondary loading signal for refresh cycles
    pub fn on_refreshing_change<F>(mut self, f: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on_refreshing_change = Arc::new(f);
        self
    }

    pub fn is_connection_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&eyre::Report) -> bool + Send + Sync + 'static,
    {
        self.is_connection_error = Arc::new(f);
        self
    }

    pub fn connection_error_threshold(mut self, threshold: u32) -> Self {
        self.connection_error_threshold = threshold;
        self
    }

    /// Escalation callback, fired on every connection error at or past the threshold
    pub fn on_connection_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_connection_error = Arc::new(f);
        self
    }
}

impl<P, R> fmt::Debug for QueryOptions<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("debounce_delay", &self.debounce_delay)
            .field("abort_superseded", &self.abort_superseded)
            .field("auto_refresh", &self.auto_refresh)
            .field("refresh_interval", &self.refresh_interval)
            .field("enable_auto_refresh", &self.enable_auto_refresh)
            .field("connection_error_threshold", &self.connection_error_threshold)
            .finish_non_exhaustive()
    }
}
