//! Error types for ytdlp-engine
//!
//! The taxonomy follows the failure classes of the orchestration engine:
//! spawn failures (tool missing), listing parse failures, process failures
//! (non-zero exit), cancellation, and pre-queue validation errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ytdlp-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ytdlp-engine
#[derive(Debug, Error)]
pub enum Error {
    /// The external tool could not be spawned (missing or not executable).
    ///
    /// Fatal to the job attempt it belongs to; the job is marked Failed
    /// without ever having run.
    #[error("failed to spawn {executable}: {source}")]
    Spawn {
        /// The executable that could not be started
        executable: PathBuf,
        /// The underlying I/O error from the spawn attempt
        #[source]
        source: std::io::Error,
    },

    /// A one-shot probe invocation exited with a non-zero status
    #[error("probe command failed with exit code {code:?}: {stderr}")]
    Probe {
        /// Exit code of the probe process (None if killed by a signal)
        code: Option<i32>,
        /// Captured standard error output
        stderr: String,
    },

    /// A one-shot probe invocation did not finish within its time bound
    #[error("probe command timed out after {seconds}s")]
    ProbeTimeout {
        /// The timeout that was exceeded, in seconds
        seconds: u64,
    },

    /// Malformed JSON from a listing request
    #[error("listing parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Job lifecycle error
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// URL failed validation before enqueue
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Both video and audio streams were excluded from the selection
    #[error("cannot build a selection with both video and audio excluded")]
    EmptySelection,

    /// Playlist download requested with no entries selected
    #[error("no playlist entries selected")]
    NoEntriesSelected,

    /// I/O error (settings file, stream plumbing)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// The engine coordinator has stopped and no longer accepts requests
    #[error("engine closed")]
    EngineClosed,
}

/// Job lifecycle errors
#[derive(Debug, Error)]
pub enum JobError {
    /// Job not found in the queue
    #[error("job {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: u64,
    },

    /// Cannot perform operation in the job's current state
    #[error("cannot {operation} job {id} in state {current_state}")]
    InvalidState {
        /// The job ID that is in an invalid state for the operation
        id: u64,
        /// The operation that was attempted (e.g., "remove")
        operation: String,
        /// The current state that prevents the operation
        current_state: String,
    },

    /// Queue-wide operation rejected while a job is active
    #[error("cannot {operation} while job {id} is active")]
    QueueBusy {
        /// The currently active job ID
        id: u64,
        /// The rejected operation (e.g., "clear")
        operation: String,
    },

    /// Start requested on an empty queue
    #[error("queue is empty")]
    EmptyQueue,

    /// Abort requested with no active job
    #[error("no job is currently active")]
    NoActiveJob,
}
