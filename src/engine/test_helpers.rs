//! Shared test helpers for creating DownloadEngine instances in tests.
//!
//! Engine behavior is exercised against stub shell scripts standing in for
//! yt-dlp, so the process lifecycle (spawn, output, signals, exit) is the
//! real one without touching the network.

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::DownloadEngine;
use crate::types::Event;

/// Write an executable stub script standing in for yt-dlp.
#[cfg(unix)]
pub(crate) fn stub_tool(dir: &TempDir, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.path().join("yt-dlp-stub");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Engine wired to a stub tool script.
/// Returns the engine and the tempdir (which must be kept alive).
#[cfg(unix)]
pub(crate) fn stub_engine(body: &str) -> (DownloadEngine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let tool = stub_tool(&dir, body);
    let config = Config {
        ytdlp_path: Some(tool),
        search_path: false,
        destination: dir.path().join("downloads"),
        ..Default::default()
    };
    (DownloadEngine::new(config), dir)
}

/// Engine whose tool path does not exist, so every spawn fails.
pub(crate) fn broken_engine() -> DownloadEngine {
    let config = Config {
        ytdlp_path: Some(PathBuf::from("/nonexistent/yt-dlp-test-binary")),
        search_path: false,
        ..Default::default()
    };
    DownloadEngine::new(config)
}

/// Await the next event matching `pred`, skipping others, with a timeout.
pub(crate) async fn wait_for_event(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
