//! Integration tests for auto-refresh
//!
//! All tests run on paused time, so delays are exact and instant.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use autoquery::{QueryCoordinator, RefreshPhase, RunOptions, query_fn};
use common::{Recorder, assert_offsets, is_connection_refused, settle};

#[tokio::test(start_paused = true)]
async fn test_interval_measured_from_completion() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(a)
    });
    let options = rec.options(query).refresh_interval(Duration::from_secs(1));
    let _handle = QueryCoordinator::spawn(1u32, options);

    settle(2300).await;

    assert_offsets(&rec.started(), &[0, 1100, 2200]);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_uses_refreshing_signal_not_loading() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move { Ok(a) });
    let options = rec.options(query).refresh_interval(Duration::from_secs(1));
    let handle = QueryCoordinator::spawn(1u32, options);

    settle(10).await;
    assert_eq!(handle.status().await.unwrap().refresh_phase, Some(RefreshPhase::Scheduled));

    settle(1000).await;
    assert_eq!(rec.results(), vec!["1", "1"]);
    assert_eq!(rec.loading(), vec![true, false]);
    assert_eq!(rec.refreshing(), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_disable_cancels_scheduled_refresh() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move { Ok(a) });
    let options = rec.options(query).refresh_interval(Duration::from_secs(1));
    let handle = QueryCoordinator::spawn(1u32, options);
    settle(500).await;

    handle.set_auto_refresh(false).unwrap();
    settle(3000).await;
    assert_eq!(rec.calls(), 1);
    assert_eq!(handle.status().await.unwrap().refresh_phase, Some(RefreshPhase::Disabled));

    // Re-enabling runs right away, then resumes the cadence
    handle.set_auto_refresh(true).unwrap();
    settle(10).await;
    assert_eq!(rec.calls(), 2);

    settle(1000).await;
    assert_eq!(rec.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_enable_when_already_enabled_does_not_run() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move { Ok(a) });
    let options = rec.options(query).refresh_interval(Duration::from_secs(1));
    let handle = QueryCoordinator::spawn(1u32, options);
    settle(10).await;

    handle.set_auto_refresh(true).unwrap();
    settle(10).await;

    assert_eq!(rec.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_starts_disabled() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move { Ok(a) });
    let options = rec
        .options(query)
        .refresh_interval(Duration::from_secs(1))
        .enable_auto_refresh(false);
    let handle = QueryCoordinator::spawn(1u32, options);

    settle(5000).await;

    assert_eq!(rec.calls(), 1);
    assert_eq!(handle.status().await.unwrap().refresh_phase, Some(RefreshPhase::Disabled));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failures_escalate_and_rearm() {
    let rec = Recorder::new();
    let query = query_fn(|_: u32| async move { Err::<u32, _>(eyre::eyre!("connection refused")) });
    let options = rec
        .options(query)
        .refresh_interval(Duration::from_secs(1))
        .is_connection_error(is_connection_refused)
        .connection_error_threshold(2);
    let handle = QueryCoordinator::spawn(1u32, options);

    settle(2500).await;

    assert_eq!(rec.calls(), 3);
    assert_eq!(rec.escalations(), 3);
    assert!(rec.errors().is_empty());
    assert_eq!(handle.status().await.unwrap().refresh_phase, Some(RefreshPhase::Scheduled));
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_refreshing_until_success() {
    let rec = Recorder::new();
    let failing = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&failing);
    let query = query_fn(move |a: u32| {
        let failing = flag.load(Ordering::SeqCst);
        async move {
            if failing {
                return Err(eyre::eyre!("refresh failed"));
            }
            Ok(a)
        }
    });
    let options = rec.options(query).refresh_interval(Duration::from_secs(1));
    let handle = QueryCoordinator::spawn(1u32, options);
    settle(10).await;

    failing.store(true, Ordering::SeqCst);
    settle(1090).await;
    assert_eq!(rec.refreshing(), vec![true]);
    assert_eq!(rec.errors(), vec!["refresh failed"]);
    assert_eq!(handle.status().await.unwrap().refresh_phase, Some(RefreshPhase::Scheduled));

    // The failed refresh re-armed the timer; the next success clears the signal
    failing.store(false, Ordering::SeqCst);
    settle(1000).await;
    assert_eq!(rec.refreshing(), vec![true, true, false]);
    assert_eq!(rec.results(), vec!["1", "1"]);
}

#[tokio::test(start_paused = true)]
async fn test_disable_during_refresh_completes_without_rearming() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(a)
    });
    let options = rec.options(query).refresh_interval(Duration::from_secs(1));
    let handle = QueryCoordinator::spawn(1u32, options);

    // Mount settles at 200ms, the refresh starts at 1200ms
    settle(1300).await;
    assert_eq!(rec.calls(), 2);
    assert_eq!(handle.status().await.unwrap().refresh_phase, Some(RefreshPhase::Refreshing));

    handle.set_auto_refresh(false).unwrap();
    settle(5000).await;

    assert_eq!(rec.calls(), 2);
    assert_eq!(rec.results(), vec!["1", "1"]);
    assert_eq!(rec.refreshing(), vec![true, false]);
    assert_eq!(handle.status().await.unwrap().refresh_phase, Some(RefreshPhase::Disabled));
}

#[tokio::test(start_paused = true)]
async fn test_param_change_reschedules_refresh() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move { Ok(a) });
    let options = rec
        .options(query)
        .refresh_interval(Duration::from_secs(1))
        .should_query_immediately(|_, _| false)
        .debounce_delay(Duration::from_millis(500));
    let handle = QueryCoordinator::spawn(1u32, options);

    handle.set_params(2).unwrap();
    settle(1600).await;

    assert_offsets(&rec.started(), &[0, 500, 1500]);
    assert_eq!(rec.results(), vec!["1", "2", "2"]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_run_reschedules_refresh() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move { Ok(a) });
    let options = rec.options(query).refresh_interval(Duration::from_secs(1));
    let handle = QueryCoordinator::spawn(1u32, options);
    settle(700).await;

    handle.do_query(RunOptions::default()).unwrap();
    settle(1100).await;

    assert_offsets(&rec.started(), &[0, 700, 1700]);
}

#[tokio::test(start_paused = true)]
async fn test_skipped_refresh_keeps_cadence() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move { Ok(a) });
    let options = rec
        .options(query)
        .refresh_interval(Duration::from_secs(1))
        .should_skip_query(|a: &u32| *a == 0);
    let handle = QueryCoordinator::spawn(1u32, options);
    settle(10).await;

    // Skipping leaves the schedule armed; refreshes are skipped until params allow
    handle.set_params(0).unwrap();
    settle(2500).await;
    assert_eq!(rec.calls(), 1);
    assert_eq!(rec.refreshing(), vec![true, false, true, false]);

    handle.set_params(5).unwrap();
    settle(10).await;
    assert_eq!(rec.results(), vec!["1", "5"]);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_refresh() {
    let rec = Recorder::new();
    let query = query_fn(|a: u32| async move { Ok(a) });
    let options = rec.options(query).refresh_interval(Duration::from_secs(1));
    let handle = QueryCoordinator::spawn(1u32, options);
    settle(10).await;

    drop(handle);
    settle(5000).await;

    assert_eq!(rec.calls(), 1);
}
