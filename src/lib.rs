//! # ytdlp-engine
//!
//! Job orchestration engine for driving yt-dlp through a queue of downloads.
//!
//! ## Design Philosophy
//!
//! ytdlp-engine is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Strictly serial** - One external process at a time; a shared
//!   destination directory makes concurrent writes unsafe and progress
//!   reporting ambiguous
//! - **Single-writer** - All queue state lives in one coordinator task;
//!   handles send commands and read snapshots
//!
//! ## Quick Start
//!
//! ```no_run
//! use ytdlp_engine::{Config, DownloadEngine, JobSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = DownloadEngine::new(Config::default());
//!
//!     // Subscribe to events
//!     let mut events = engine.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let spec = JobSpec::new("https://example.com/v1", "bestvideo+bestaudio")?;
//!     engine.add_job(spec).await?;
//!     engine.start().await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration and settings persistence
pub mod config;
/// Job orchestration engine (decomposed into focused submodules)
pub mod engine;
/// Error types
pub mod error;
/// Format selection derivations
pub mod format;
/// Serde model of the tool's metadata listing
pub mod listing;
/// One-shot version and listing probes
pub mod probe;
/// Streaming progress parser
pub mod progress;
/// Process supervision
pub mod supervisor;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use engine::{DownloadEngine, PlaylistBatch, PlaylistEntry, PlaylistQuality};
pub use error::{Error, JobError, Result};
pub use format::{FormatSelection, StreamChoice, SubtitleChoice};
pub use listing::{FormatDescriptor, Listing};
pub use progress::parse_progress;
pub use supervisor::{ProcessExit, ProcessMessage, ToolProcess};
pub use types::{Event, Job, JobId, JobSpec, JobStatus, Progress, QueueStats};

/// Helper function to run the engine with graceful signal handling.
///
/// Waits for a termination signal and then calls the engine's `shutdown()`
/// method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with a `ctrl_c` fallback if
///   signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use ytdlp_engine::{Config, DownloadEngine, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = DownloadEngine::new(Config::default());
///     run_with_shutdown(engine).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(engine: DownloadEngine) -> Result<()> {
    wait_for_signal().await;
    engine.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // signal registration may fail in restricted environments
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
