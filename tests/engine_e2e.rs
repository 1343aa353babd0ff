//! End-to-end tests driving the engine through its public API only.
//!
//! A shell script standing in for yt-dlp lets the full process lifecycle
//! run (spawn, output capture, exit classification) without touching the
//! network or requiring the real tool.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use ytdlp_engine::{Config, DownloadEngine, Event, JobSpec, JobStatus};

/// Write an executable shell script into `dir` and return its path.
fn write_stub(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("yt-dlp");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Engine whose yt-dlp is a stub script running `body`.
fn stub_engine(body: &str) -> (DownloadEngine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let stub = write_stub(&dir, body);
    let config = Config {
        ytdlp_path: Some(stub),
        search_path: false,
        ..Config::default()
    };
    (DownloadEngine::new(config), dir)
}

/// Collect events until the predicate matches one, with a hard timeout.
async fn collect_until(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    stop: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            let done = stop(&event);
            seen.push(event);
            if done {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for events");
    seen
}

#[tokio::test]
async fn full_lifecycle_over_the_public_api() {
    let (engine, _dir) = stub_engine(
        r#"echo '[download]  55.0% of 10.00MiB at 2.00MiB/s ETA 00:03'
exit 0"#,
    );
    let mut events = engine.subscribe();

    let first = engine
        .add_job(JobSpec::new("https://example.com/a", "bestvideo+bestaudio").unwrap())
        .await
        .unwrap();
    let second = engine
        .add_job(JobSpec::new("https://example.com/b", "bestaudio").unwrap())
        .await
        .unwrap();

    assert!(engine.start().await.unwrap(), "start should begin processing");

    let seen = collect_until(&mut events, |e| matches!(e, Event::QueueDrained)).await;

    // Both jobs ran to completion in arrival order.
    let completions: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            Event::JobStatusChanged {
                id,
                status: JobStatus::Completed,
            } => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(completions, vec![first, second]);

    // The stub's progress line surfaced as a structured update.
    assert!(
        seen.iter().any(|e| matches!(
            e,
            Event::ProgressUpdated { id, percent: 55, .. } if *id == first
        )),
        "expected a 55% progress event for the first job, got {seen:?}"
    );

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.pending, 0);
    assert!(!stats.processing);
}

#[tokio::test]
async fn settings_persist_across_engine_instances() {
    let dir = tempfile::tempdir().unwrap();
    let stub = write_stub(&dir, "exit 0");
    let settings = dir.path().join("settings.json");

    let config = Config {
        ytdlp_path: Some(stub),
        search_path: false,
        limit_rate: Some("2M".to_string()),
        custom_options: vec!["--no-mtime".to_string()],
        ..Config::default()
    };
    config.save(&settings).unwrap();

    let reloaded = Config::load(&settings).unwrap();
    assert_eq!(reloaded.limit_rate.as_deref(), Some("2M"));
    assert_eq!(reloaded.custom_options, vec!["--no-mtime".to_string()]);

    // A fresh engine built from the reloaded settings is fully usable.
    let engine = DownloadEngine::new(reloaded);
    let id = engine
        .add_job(JobSpec::new("https://example.com/v", "best").unwrap())
        .await
        .unwrap();
    let job = engine.job(id).await.unwrap().expect("job should exist");
    assert_eq!(job.status, JobStatus::Pending);
    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_closes_every_cloned_handle() {
    let (engine, _dir) = stub_engine("exit 0");
    let clone = engine.clone();

    engine.shutdown().await.unwrap();

    let err = clone
        .add_job(JobSpec::new("https://example.com/v", "best").unwrap())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ytdlp_engine::Error::EngineClosed),
        "cloned handle should see the closed engine, got {err:?}"
    );
}
