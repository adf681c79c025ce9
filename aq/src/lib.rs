//! autoquery - Debounced, cancellable, auto-refreshing query coordinator
//!
//! Given a parameterized async operation, a coordinator decides when to run
//! it, guarantees that only the most recent run's result is delivered, keeps a
//! loading signal from flickering under overlapping runs, optionally repeats
//! the query on a timer and escalates persistent connectivity failures.
//!
//! # Core Concepts
//!
//! - **Generations**: every run gets a strictly increasing id; a completion
//!   whose generation is no longer current is discarded silently
//! - **Debounce**: a policy predicate decides whether a parameter change runs
//!   now or after a delay; newer changes abandon a pending delay
//! - **Asymmetric loading**: loading is cleared only by the current run's
//!   success, never by a failure or a superseded run
//! - **Escalation**: consecutive connection errors at or past a threshold fire
//!   a dedicated callback on every occurrence
//!
//! # Modules
//!
//! - [`coordinator`] - The coordinator task, its handle and options
//! - [`query`] - The `Query` trait and closure adapter
//! - [`debounce`], [`generation`], [`loading`], [`escalation`], [`refresh`] - Building blocks
//! - [`validation`] - Debounced async field validation
//! - [`config`] - Configuration types and loading
//! - [`http`] - HTTP endpoint query used by the CLI
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod escalation;
pub mod generation;
pub mod http;
pub mod loading;
pub mod query;
pub mod refresh;
pub mod validation;

mod timer;

// Re-export commonly used types
pub use config::{Config, QueryConfig, RefreshConfig};
pub use coordinator::{CoordinatorHandle, CoordinatorStatus, QueryCoordinator, QueryOptions, RunOptions, RunOutcome};
pub use debounce::{DebounceDecision, decide};
pub use error::QueryError;
pub use escalation::{ConnectionErrorCounter, ErrorClass, ErrorEscalator};
pub use generation::{ActiveTask, GenerationTracker, QueryRequest};
pub use loading::LoadingArbiter;
pub use query::{Query, QueryFn, query_fn};
pub use refresh::{RefreshPhase, RefreshScheduler, RunOrigin};
pub use validation::{AsyncValidation, AsyncValidator, ValidatorOutput, async_validator, combine_validator_output};
