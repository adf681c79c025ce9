//! The coordinated operation

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use eyre::{Result, eyre};
use futures::FutureExt;

/// A parameterized asynchronous operation driven by a coordinator.
///
/// Implementations own their own timeout policy; the coordinator never times
/// a query out. Dropping the returned future must be safe, since superseded
/// runs may be aborted.
#[async_trait]
pub trait Query<P>: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn run(&self, params: P) -> Result<Self::Output>;
}

/// Adapter turning an async closure into a [`Query`]
#[derive(Clone)]
pub struct QueryFn<F> {
    f: F,
}

/// Wrap a closure returning a future as a [`Query`]
///
/// ```
/// use autoquery::query_fn;
///
/// let query = query_fn(|id: u32| async move { Ok(format!("[{id}]")) });
/// # let _ = query;
/// ```
pub fn query_fn<P, F, Fut, R>(f: F) -> QueryFn<F>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    QueryFn { f }
}

#[async_trait]
impl<P, F, Fut, R> Query<P> for QueryFn<F>
where
    P: Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    type Output = R;

    async fn run(&self, params: P) -> Result<R> {
        (self.f)(params).await
    }
}

/// Run a query, converting a panic into an ordinary failure.
///
/// A panic while building the future and a panic while polling it both land
/// here, so callers see one failure path.
pub(crate) async fn run_guarded<P, Q>(query: &Q, params: P) -> Result<Q::Output>
where
    Q: Query<P> + ?Sized,
{
    match AssertUnwindSafe(async { query.run(params).await }).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(eyre!("Query panicked: {}", panic_message(&payload))),
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_fn_runs_closure() {
        let query = query_fn(|a: u32| async move { Ok(format!("[{}]", a)) });

        let result = query.run(1).await.unwrap();
        assert_eq!(result, "[1]");
    }

    #[tokio::test]
    async fn test_run_guarded_passes_errors_through() {
        let query = query_fn(|_: ()| async move { Err::<(), _>(eyre!("test error")) });

        let err = run_guarded(&query, ()).await.unwrap_err();
        assert_eq!(err.to_string(), "test error");
    }

    #[tokio::test]
    async fn test_run_guarded_catches_synchronous_panic() {
        let query = query_fn(|_: ()| -> futures::future::Ready<Result<()>> { panic!("no backend configured") });

        let err = run_guarded(&query, ()).await.unwrap_err();
        assert!(err.to_string().contains("no backend configured"));
    }

    #[tokio::test]
    async fn test_run_guarded_catches_panic_while_polling() {
        let query = query_fn(|a: u32| async move {
            if a > 0 {
                panic!("bad param {}", a);
            }
            Ok(a)
        });

        let err = run_guarded(&query, 3).await.unwrap_err();
        assert!(err.to_string().contains("bad param 3"));
    }
}
