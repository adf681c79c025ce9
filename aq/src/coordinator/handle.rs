//! CoordinatorHandle - Client interface for a query coordinator

use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use super::messages::{Command, CoordinatorStatus, RunOptions, RunOutcome};
use crate::error::QueryError;

/// Handle for driving a running coordinator
///
/// Cheap to clone. When the last handle is dropped the coordinator tears
/// down: pending timers are cancelled and the active run is aborted.
pub struct CoordinatorHandle<P> {
    tx: mpsc::UnboundedSender<Command<P>>,
    id: Uuid,
}

impl<P> Clone for CoordinatorHandle<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            id: self.id,
        }
    }
}

impl<P> CoordinatorHandle<P> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command<P>>, id: Uuid) -> Self {
        debug!(%id, "CoordinatorHandle::new: called");
        Self { tx, id }
    }

    /// Get the coordinator's id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the coordinator task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, command: Command<P>) -> Result<(), QueryError> {
        self.tx.send(command).map_err(|_| QueryError::Shutdown)
    }

    /// Report new parameters; runs now or after the debounce delay
    pub fn set_params(&self, params: P) -> Result<(), QueryError> {
        debug!(id = %self.id, "CoordinatorHandle::set_params: called");
        self.send(Command::SetParams(params))
    }

    /// Run the query with the current params, routing failures to the error callbacks
    pub fn do_query(&self, options: RunOptions) -> Result<(), QueryError> {
        debug!(id = %self.id, ?options, "CoordinatorHandle::do_query: called");
        self.send(Command::Run { options, reply: None })
    }

    /// Run the query and wait for this specific run to finish.
    ///
    /// Failures are returned instead of being passed to `on_error`. If a newer
    /// run starts first, this resolves with [`QueryError::Superseded`].
    pub async fn do_query_async(&self, options: RunOptions) -> Result<RunOutcome, QueryError> {
        debug!(id = %self.id, ?options, "CoordinatorHandle::do_query_async: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Run {
            options,
            reply: Some(reply_tx),
        })?;

        reply_rx.await.map_err(|_| QueryError::Shutdown)?
    }

    /// Enable or disable auto-refresh at runtime
    pub fn set_auto_refresh(&self, enabled: bool) -> Result<(), QueryError> {
        debug!(id = %self.id, %enabled, "CoordinatorHandle::set_auto_refresh: called");
        self.send(Command::SetAutoRefresh(enabled))
    }

    /// Get a snapshot of the coordinator's state
    pub async fn status(&self) -> Result<CoordinatorStatus, QueryError> {
        debug!(id = %self.id, "CoordinatorHandle::status: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Status(reply_tx))?;
        reply_rx.await.map_err(|_| QueryError::Shutdown)
    }

    /// Stop the coordinator
    pub fn shutdown(&self) -> Result<(), QueryError> {
        debug!(id = %self.id, "CoordinatorHandle::shutdown: called");
        self.send(Command::Shutdown)
    }
}
