//! Queue membership and snapshots

use crate::error::Result;
use crate::types::{Job, JobId, JobSpec, QueueStats};

use super::runner::Command;
use super::DownloadEngine;

impl DownloadEngine {
    /// Add a job to the back of the queue.
    ///
    /// The job starts Pending; nothing runs until [`start`] is called.
    /// Rejected once shutdown has begun.
    ///
    /// [`start`]: DownloadEngine::start
    pub async fn add_job(&self, spec: JobSpec) -> Result<JobId> {
        self.command(|reply| Command::Add { spec, reply }).await?
    }

    /// Remove one job from the queue.
    ///
    /// The active job cannot be removed; stop or abort it first. Pending
    /// and finished jobs can be removed freely.
    pub async fn remove_job(&self, id: JobId) -> Result<()> {
        self.command(|reply| Command::Remove { id, reply }).await?
    }

    /// Remove every job from the queue, returning how many were removed.
    ///
    /// Rejected while any job is active.
    pub async fn clear_queue(&self) -> Result<usize> {
        self.command(|reply| Command::Clear { reply }).await?
    }

    /// Snapshot of every job in arrival order.
    pub async fn jobs(&self) -> Result<Vec<Job>> {
        self.command(|reply| Command::Snapshot { reply }).await
    }

    /// Snapshot of one job, or None if it is not in the queue.
    pub async fn job(&self, id: JobId) -> Result<Option<Job>> {
        self.command(|reply| Command::GetJob { id, reply }).await
    }

    /// Per-status counts and the processing flag.
    pub async fn stats(&self) -> Result<QueueStats> {
        self.command(|reply| Command::Stats { reply }).await
    }
}
