//! Core types for ytdlp-engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Unique identifier for a queued job
///
/// Identifiers are assigned monotonically in arrival order and are never
/// reused within one engine instance, so they double as the queue's FIFO
/// position witness.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<JobId> for u64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Job status
///
/// Transitions are driven exclusively by the queue coordinator:
/// `Pending → Active → {Completed, Aborted, Failed}`, plus the single
/// backward edge `Active → Pending` taken when queue processing is stopped
/// while the job is running.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting in the queue for its turn
    Pending,
    /// Bound to the running external process
    Active,
    /// Process exited with status zero
    Completed,
    /// Cancelled by the user (terminal)
    Aborted,
    /// Process exited abnormally
    Failed {
        /// Raw exit code (None for spawn or stream-read failures)
        code: Option<i32>,
    },
}

impl JobStatus {
    /// Whether this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Aborted | JobStatus::Failed { .. }
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Active => write!(f, "active"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Aborted => write!(f, "aborted"),
            JobStatus::Failed { code: Some(c) } => write!(f, "failed (exit code {c})"),
            JobStatus::Failed { code: None } => write!(f, "failed"),
        }
    }
}

/// Immutable description of one download request
///
/// Created at enqueue time by the caller (typically via
/// [`JobSpec::new`] or the playlist batch builder) and never mutated
/// afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobSpec {
    /// Source URL handed to the external tool
    pub url: String,

    /// Resolved format selector string (e.g. `"137+140"`, `"bestaudio"`)
    pub selector: String,

    /// Human-readable format label, used in the output filename template
    pub label: String,

    /// Destination directory override (None = engine config destination)
    #[serde(default)]
    pub destination: Option<PathBuf>,

    /// Invocation arguments beyond format/destination (subtitle flags,
    /// merge flags, extraction flags)
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Comma-separated 1-based playlist indices (`"1,3,5"`), present only
    /// for aggregate playlist jobs
    #[serde(default)]
    pub playlist_items: Option<String>,

    /// Estimated total size in bytes (None = unknown)
    #[serde(default)]
    pub estimated_size: Option<u64>,
}

impl JobSpec {
    /// Create a spec for a single-item download, validating the URL.
    pub fn new(url: impl Into<String>, selector: impl Into<String>) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;
        let selector = selector.into();
        if selector.trim().is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok(Self {
            url,
            label: selector.clone(),
            selector,
            destination: None,
            extra_args: Vec::new(),
            playlist_items: None,
            estimated_size: None,
        })
    }

    /// Set the human-readable format label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Override the destination directory for this job only
    pub fn with_destination(mut self, dest: impl Into<PathBuf>) -> Self {
        self.destination = Some(dest.into());
        self
    }

    /// Append extra invocation arguments
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the estimated total size in bytes
    pub fn with_estimated_size(mut self, bytes: u64) -> Self {
        self.estimated_size = Some(bytes);
        self
    }
}

/// Last-known progress of a job
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Percentage complete, clamped to 0..=100
    pub percent: u8,
    /// Free-text status line scraped from the tool's output
    pub message: String,
}

/// A structured progress event parsed from one chunk of tool output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Percentage complete, clamped to 0..=100
    pub percent: u8,
    /// Human-readable status composed from the matched line
    pub message: String,
}

/// One queued download with its lifecycle state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier (monotonic, arrival order)
    pub id: JobId,

    /// The immutable request this job executes
    pub spec: JobSpec,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Last-known progress
    pub progress: Progress,

    /// When the job was added to the queue
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub(crate) fn new(id: JobId, spec: JobSpec) -> Self {
        Self {
            id,
            spec,
            status: JobStatus::Pending,
            progress: Progress::default(),
            created_at: Utc::now(),
        }
    }
}

/// Event emitted during the job lifecycle
///
/// Subscribe via [`crate::DownloadEngine::subscribe`]. Multiple subscribers
/// are supported; each receives every event independently.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job added to the queue
    JobAdded {
        /// Job ID
        id: JobId,
        /// Source URL
        url: String,
    },

    /// Job removed from the queue
    JobRemoved {
        /// Job ID
        id: JobId,
    },

    /// All jobs removed from the queue
    QueueCleared {
        /// Number of jobs removed
        removed: usize,
    },

    /// Job transitioned to a new status
    JobStatusChanged {
        /// Job ID
        id: JobId,
        /// The new status
        status: JobStatus,
    },

    /// Progress update for the active job
    ProgressUpdated {
        /// Job ID
        id: JobId,
        /// Percentage complete (0..=100)
        percent: u8,
        /// Status line
        message: String,
    },

    /// Queue processing started
    QueueStarted,

    /// Queue processing stopped by explicit request
    QueueStopped,

    /// Queue processing finished because no pending jobs remain
    QueueDrained,

    /// Graceful shutdown completed
    Shutdown,
}

/// Queue statistics snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueStats {
    /// Total number of jobs in the queue
    pub total: usize,

    /// Number of pending jobs (waiting to start)
    pub pending: usize,

    /// Number of active jobs (0 or 1 by invariant)
    pub active: usize,

    /// Number of completed jobs
    pub completed: usize,

    /// Number of aborted jobs
    pub aborted: usize,

    /// Number of failed jobs
    pub failed: usize,

    /// Whether the queue is currently advancing through pending jobs
    pub processing: bool,
}

/// Validate a source URL before it can enter the queue.
///
/// Only absolute `http`/`https` URLs with a host are accepted; anything else
/// is rejected before a process could ever be spawned for it.
pub fn validate_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(Error::InvalidUrl("URL is empty".to_string()));
    }
    let parsed =
        url::Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::InvalidUrl(format!(
                "{url}: unsupported scheme '{other}'"
            )));
        }
    }
    if parsed.host_str().is_none() {
        return Err(Error::InvalidUrl(format!("{url}: missing host")));
    }
    Ok(())
}
