//! Integration tests for the session workflow.
//!
//! Runs sessions through the async runner with the SQLite recorder and
//! checks the resulting history and statistics.

use std::sync::Arc;
use std::time::Duration;

use breathwork_core::stats::{bucket_sessions, current_streak_days};
use breathwork_core::{
    Database, Event, Period, ProtocolCatalog, RunnerOptions, SessionRunner, SessionStats,
    SilentAudio, SqliteRecorder,
};
use chrono::Utc;

fn runner_with_db(min_record_secs: u32) -> (SessionRunner, SqliteRecorder) {
    let recorder = SqliteRecorder::new(Database::open_memory().unwrap());
    let runner = SessionRunner::new(
        Arc::new(recorder.clone()),
        Arc::new(SilentAudio),
        RunnerOptions {
            tick_interval: Duration::from_secs(1),
            min_record_secs,
        },
    );
    (runner, recorder)
}

#[tokio::test(start_paused = true)]
async fn test_completed_and_abandoned_sessions_feed_stats() {
    let catalog = ProtocolCatalog::builtin();
    let (mut runner, recorder) = runner_with_db(5);

    // Full coherent session, shortened to 20 seconds: two complete cycles.
    let coherent = catalog
        .require("coherent")
        .unwrap()
        .clone()
        .with_session_duration(20);
    runner.start(coherent).await.unwrap();
    runner.wait_until_idle().await;
    assert!(runner.flush(Duration::from_secs(5)).await);

    // Box breathing abandoned after 8 seconds.
    let box_breathing = catalog.require("box-breathing").unwrap().clone();
    runner.start(box_breathing).await.unwrap();
    tokio::time::sleep(Duration::from_millis(8500)).await;
    runner.end().await;
    assert!(runner.flush(Duration::from_secs(5)).await);

    // Too short to keep.
    let relaxing = catalog.require("relaxing-478").unwrap().clone();
    runner.start(relaxing).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    runner.end().await;
    assert!(runner.flush(Duration::from_secs(5)).await);

    let records = recorder.database().lock().unwrap().all_sessions().unwrap();
    assert_eq!(records.len(), 2);

    let stats = SessionStats::from_records(&records);
    assert_eq!(stats.total_sessions, 2);
    assert_eq!(stats.completed_sessions, 1);
    assert_eq!(stats.total_secs, 28);
    assert_eq!(stats.total_cycles, 2);

    let coherent_row = records.iter().find(|r| r.protocol_id == "coherent").unwrap();
    assert!(coherent_row.completed);
    assert_eq!(coherent_row.target_secs, 20);

    let box_row = records.iter().find(|r| r.protocol_id == "box-breathing").unwrap();
    assert!(!box_row.completed);
    assert_eq!(box_row.completed_secs, 8);

    let today = Utc::now().date_naive();
    let buckets = bucket_sessions(&records, Period::Day, today, 7);
    assert_eq!(buckets.len(), 7);
    assert_eq!(buckets[6].sessions, 2);
    assert_eq!(current_streak_days(&records, today), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_phase_protocol_runs_through_runner() {
    let catalog = ProtocolCatalog::builtin();
    let (mut runner, recorder) = runner_with_db(5);
    let mut events = runner.events();

    let energizing = catalog
        .require("energizing")
        .unwrap()
        .clone()
        .with_session_duration(8);
    runner.start(energizing).await.unwrap();

    let mut watch = runner.subscribe();
    while watch.changed().await.is_ok() {
        let snap = watch.borrow_and_update().clone();
        // The zero-length "Rest" phases are never shown.
        assert_ne!(snap.phase_label.as_deref(), Some("Rest"));
        if !snap.state.is_active() {
            break;
        }
    }

    let mut cycles = 0;
    while let Ok(event) = events.try_recv() {
        if let Event::CycleCompleted { cycles: n, .. } = event {
            cycles = n;
        }
    }
    assert_eq!(cycles, 2);

    assert!(runner.flush(Duration::from_secs(5)).await);
    let records = recorder.database().lock().unwrap().all_sessions().unwrap();
    assert_eq!(records[0].cycles, 2);
    assert!(records[0].completed);
}
