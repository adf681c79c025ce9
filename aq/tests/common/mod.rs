//! Shared helpers for coordinator integration tests

#![allow(dead_code)]

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autoquery::{Query, QueryOptions};
use tokio::time::Instant;

/// Records every callback a coordinator makes
pub struct Recorder {
    origin: Instant,
    results: Mutex<Vec<String>>,
    loading: Mutex<Vec<bool>>,
    refreshing: Mutex<Vec<bool>>,
    started: Mutex<Vec<u64>>,
    errors: Mutex<Vec<String>>,
    escalations: Mutex<u32>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            results: Mutex::new(Vec::new()),
            loading: Mutex::new(Vec::new()),
            refreshing: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            escalations: Mutex::new(0),
        })
    }

    /// Options wired to this recorder; results are recorded in Debug form
    pub fn options<P, R, Q>(self: &Arc<Self>, query: Q) -> QueryOptions<P, R>
    where
        P: 'static,
        R: Debug + Send + 'static,
        Q: Query<P, Output = R>,
    {
        let results = Arc::clone(self);
        let loading = Arc::clone(self);
        let refreshing = Arc::clone(self);
        let started = Arc::clone(self);
        let errors = Arc::clone(self);
        let escalations = Arc::clone(self);

        QueryOptions::new(query, move |r: R| results.results.lock().unwrap().push(format!("{:?}", r)))
            .on_loading_change(move |l| loading.loading.lock().unwrap().push(l))
            .on_refreshing_change(move |r| refreshing.refreshing.lock().unwrap().push(r))
            .on_query_started(move || {
                let offset = started.origin.elapsed().as_millis() as u64;
                started.started.lock().unwrap().push(offset);
            })
            .on_error(move |e| errors.errors.lock().unwrap().push(e.to_string()))
            .on_connection_error(move || *escalations.escalations.lock().unwrap() += 1)
    }

    pub fn results(&self) -> Vec<String> {
        self.results.lock().unwrap().clone()
    }

    pub fn loading(&self) -> Vec<bool> {
        self.loading.lock().unwrap().clone()
    }

    pub fn refreshing(&self) -> Vec<bool> {
        self.refreshing.lock().unwrap().clone()
    }

    /// Milliseconds since the recorder was created, one per started run
    pub fn started(&self) -> Vec<u64> {
        self.started.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn escalations(&self) -> u32 {
        *self.escalations.lock().unwrap()
    }
}

/// Let paused time run forward
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Timer wheel granularity is one millisecond; allow a little slack
pub fn assert_offsets(actual: &[u64], expected: &[u64]) {
    assert_eq!(actual.len(), expected.len(), "offsets {:?}, expected {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(*e) <= 5, "offsets {:?}, expected {:?}", actual, expected);
    }
}

pub fn is_connection_refused(err: &eyre::Report) -> bool {
    err.to_string().contains("connection refused")
}
