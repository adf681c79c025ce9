//! Query coordinator
//!
//! One coordinator owns one parameterized query and decides when to run it:
//! - **Debounce:** parameter changes run immediately or after a delay
//! - **Supersede:** only the newest run's outcome is ever delivered
//! - **Auto-refresh:** optionally repeat the query after each completion

mod config;
mod core;
mod handle;
mod messages;

pub use config::QueryOptions;
pub use self::core::QueryCoordinator;
pub use handle::CoordinatorHandle;
pub use messages::{CoordinatorStatus, RunOptions, RunOutcome};
