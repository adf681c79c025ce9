//! Coordinator error types

use thiserror::Error;

/// Errors surfaced to callers of a [`CoordinatorHandle`](crate::coordinator::CoordinatorHandle)
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query generation {generation} was superseded by a newer run")]
    Superseded { generation: u64 },

    #[error("Coordinator has shut down")]
    Shutdown,

    #[error("Query failed: {0}")]
    Failed(eyre::Report),
}

impl QueryError {
    /// Check if a newer run replaced the one being awaited
    pub fn is_superseded(&self) -> bool {
        matches!(self, QueryError::Superseded { .. })
    }

    /// Check if the coordinator is gone
    pub fn is_shutdown(&self) -> bool {
        matches!(self, QueryError::Shutdown)
    }

    /// Get the underlying query failure, if any
    pub fn failure(&self) -> Option<&eyre::Report> {
        match self {
            QueryError::Failed(report) => Some(report),
            _ => None,
        }
    }
}
