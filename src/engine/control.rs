//! Processing control: start, stop, abort, shutdown

use crate::error::Result;
use crate::types::JobId;

use super::runner::Command;
use super::DownloadEngine;

impl DownloadEngine {
    /// Start advancing through pending jobs, one at a time in arrival order.
    ///
    /// Returns `Ok(false)` when the queue was already processing (a
    /// reported no-op). Fails with `EmptyQueue` when there is nothing
    /// queued at all.
    pub async fn start(&self) -> Result<bool> {
        self.command(|reply| Command::Start { reply }).await?
    }

    /// Stop queue processing.
    ///
    /// The active job, if any, is sent the termination signal and returns
    /// to Pending once its process exits, so a later [`start`] resumes it.
    /// Returns `Ok(false)` when the queue was not processing.
    ///
    /// [`start`]: DownloadEngine::start
    pub async fn stop(&self) -> Result<bool> {
        self.command(|reply| Command::Stop { reply }).await?
    }

    /// Terminate just the active job.
    ///
    /// The job is marked Aborted when its process exits; if the queue is
    /// processing it then advances to the next pending job. Fails with
    /// `NoActiveJob` when nothing is running.
    pub async fn abort_active(&self) -> Result<JobId> {
        self.command(|reply| Command::AbortActive { reply }).await?
    }

    /// Gracefully shut the engine down.
    ///
    /// Cancels the active process, waits for it to exit, emits
    /// [`Event::Shutdown`], and stops the coordinator. Further requests on
    /// any handle fail with `EngineClosed`.
    ///
    /// [`Event::Shutdown`]: crate::Event::Shutdown
    pub async fn shutdown(&self) -> Result<()> {
        self.command(|reply| Command::Shutdown { reply }).await
    }
}
