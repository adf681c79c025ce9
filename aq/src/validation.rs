//! Debounced async field validation
//!
//! Wraps a coordinator so an expensive validator (a uniqueness check against
//! a backend, say) runs only after the value stops changing, and only once the
//! synchronous validators pass.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use eyre::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::coordinator::{CoordinatorHandle, QueryCoordinator, QueryOptions};
use crate::error::QueryError;
use crate::query::query_fn;

/// Result of validating a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorOutput {
    Valid,

    /// Invalid, with feedback for the user
    Invalid(String),

    /// Invalid, but the reason is shown somewhere else
    InvalidNoFeedback,

    /// Async validation has not finished for the current value
    Pending,
}

impl ValidatorOutput {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidatorOutput::Valid)
    }
}

/// Returns the first output that is not valid
pub fn combine_validator_output<I>(outputs: I) -> ValidatorOutput
where
    I: IntoIterator<Item = ValidatorOutput>,
{
    outputs
        .into_iter()
        .find(|output| !output.is_valid())
        .unwrap_or(ValidatorOutput::Valid)
}

pub type AsyncValidator<V> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<ValidatorOutput>> + Send + Sync>;

/// Box an async closure as an [`AsyncValidator`]
pub fn async_validator<V, F, Fut>(f: F) -> AsyncValidator<V>
where
    F: Fn(V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ValidatorOutput>> + Send + 'static,
{
    Arc::new(move |value| f(value).boxed())
}

#[derive(Debug, Clone, PartialEq)]
struct ValidationParams<V> {
    value: V,
    synchronous_validators_valid: bool,
}

#[derive(Debug)]
struct ValidationState<V> {
    value: V,
    computed_for: Option<V>,
    output: ValidatorOutput,
    in_progress: bool,
}

/// Async validator bound to one field
pub struct AsyncValidation<V> {
    handle: CoordinatorHandle<ValidationParams<V>>,
    state: Arc<Mutex<ValidationState<V>>>,
}

impl<V> AsyncValidation<V>
where
    V: Clone + PartialEq + Send + 'static,
{
    /// Start validating `value`. Changes to the value are debounced; a flip
    /// of `synchronous_validators_valid` runs immediately.
    pub fn spawn<E>(
        value: V,
        synchronous_validators_valid: bool,
        validator: AsyncValidator<V>,
        debounce_delay: Duration,
        on_error: E,
    ) -> Self
    where
        E: Fn(&eyre::Report) + Send + Sync + 'static,
    {
        debug!(%synchronous_validators_valid, ?debounce_delay, "AsyncValidation::spawn: called");
        let state = Arc::new(Mutex::new(ValidationState {
            value: value.clone(),
            computed_for: None,
            output: ValidatorOutput::Pending,
            in_progress: false,
        }));

        let query = query_fn(move |params: ValidationParams<V>| {
            let validator = Arc::clone(&validator);
            async move {
                let output = validator(params.value.clone()).await?;
                Ok((params.value, output))
            }
        });

        let on_result = Arc::clone(&state);
        let on_loading = Arc::clone(&state);
        let options = QueryOptions::new(query, move |(value, output): (V, ValidatorOutput)| {
            let mut state = lock(&on_result);
            state.computed_for = Some(value);
            state.output = output;
        })
        .on_loading_change(move |loading| lock(&on_loading).in_progress = loading)
        .should_query_immediately(|prev: &ValidationParams<V>, cur: &ValidationParams<V>| {
            prev.synchronous_validators_valid != cur.synchronous_validators_valid
        })
        .should_skip_query(|params: &ValidationParams<V>| !params.synchronous_validators_valid)
        .debounce_delay(debounce_delay)
        .on_error(on_error);

        let handle = QueryCoordinator::spawn(
            ValidationParams {
                value,
                synchronous_validators_valid,
            },
            options,
        );

        Self { handle, state }
    }

    /// Report the field's latest value and synchronous validity
    pub fn update(&self, value: V, synchronous_validators_valid: bool) -> Result<(), QueryError> {
        lock(&self.state).value = value.clone();
        self.handle.set_params(ValidationParams {
            value,
            synchronous_validators_valid,
        })
    }

    /// Current validity of the latest value
    pub fn output(&self) -> ValidatorOutput {
        let state = lock(&self.state);
        let debounce_in_progress = state.computed_for.as_ref() != Some(&state.value);
        if state.in_progress || debounce_in_progress {
            return ValidatorOutput::Pending;
        }
        state.output.clone()
    }

    pub fn shutdown(&self) -> Result<(), QueryError> {
        self.handle.shutdown()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
