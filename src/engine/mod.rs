//! Job orchestration engine split into focused submodules.
//!
//! The `DownloadEngine` handle and its methods are organized by domain:
//! - [`queue`] - Queue membership and snapshots (add/remove/clear/stats)
//! - [`control`] - Processing control (start/stop/abort/shutdown)
//! - [`playlist`] - Batch submission of selected playlist entries
//! - [`invocation`] - yt-dlp argument construction for one job
//! - [`runner`] - The single-writer coordinator loop
//!
//! All queue state lives inside one coordinator task. The handle sends
//! commands over an mpsc channel and awaits the reply; output chunks and
//! exit statuses from the supervised process arrive on the same channel, so
//! every mutation happens in one place and in one well-defined order.

mod control;
mod invocation;
mod playlist;
mod queue;
mod runner;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use playlist::{PlaylistBatch, PlaylistEntry, PlaylistQuality};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::listing::Listing;
use crate::types::Event;
use runner::{Command, EngineMsg};

/// Cloneable handle to the job orchestration engine.
///
/// Creating an engine spawns its coordinator task; all clones talk to the
/// same queue. The coordinator runs until [`shutdown`] is called or the
/// last handle is dropped. On the drop path an active process still runs
/// to its natural exit and is recorded, but no further jobs activate and
/// no [`Event::Shutdown`] is emitted; call [`shutdown`] for the orderly
/// variant.
///
/// [`shutdown`]: DownloadEngine::shutdown
///
/// # Examples
///
/// ```no_run
/// use ytdlp_engine::{Config, DownloadEngine, JobSpec};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = DownloadEngine::new(Config::default());
///
///     let mut events = engine.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("{event:?}");
///         }
///     });
///
///     let spec = JobSpec::new("https://example.com/v1", "bestvideo+bestaudio")?;
///     engine.add_job(spec).await?;
///     engine.start().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DownloadEngine {
    cmd_tx: mpsc::Sender<EngineMsg>,
    event_tx: broadcast::Sender<Event>,
    config: Arc<Config>,
}

impl DownloadEngine {
    /// Create an engine and spawn its coordinator task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        // 1000 buffered events per subscriber before lagging
        let (event_tx, _rx) = broadcast::channel(1000);
        let (cmd_tx, cmd_rx) = mpsc::channel(256);

        tokio::spawn(runner::run(
            config.clone(),
            event_tx.clone(),
            cmd_tx.downgrade(),
            cmd_rx,
        ));

        Self {
            cmd_tx,
            event_tx,
            config,
        }
    }

    /// Subscribe to engine events.
    ///
    /// Multiple subscribers are supported; each receives every event
    /// independently. A subscriber that falls more than 1000 events behind
    /// receives a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this engine was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch the metadata listing for one URL via `-J`.
    ///
    /// One-shot request bounded by the configured listing timeout; the
    /// queue is not involved and no job is created.
    pub async fn analyze(&self, url: &str) -> Result<Listing> {
        let deadline = Duration::from_secs(self.config.listing_timeout_secs);
        crate::probe::fetch_listing(&self.config.ytdlp_executable(), url, deadline).await
    }

    /// Probe the yt-dlp version.
    pub async fn ytdlp_version(&self) -> Result<String> {
        crate::probe::ytdlp_version(&self.config.ytdlp_executable()).await
    }

    /// Probe the ffmpeg version.
    pub async fn ffmpeg_version(&self) -> Result<String> {
        let executable = self
            .config
            .ffmpeg_executable()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));
        crate::probe::ffmpeg_version(&executable).await
    }

    /// Send one command to the coordinator and await its reply.
    async fn command<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineMsg::Command(build(reply)))
            .await
            .map_err(|_| Error::EngineClosed)?;
        rx.await.map_err(|_| Error::EngineClosed)
    }
}
