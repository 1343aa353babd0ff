//! Single-writer coordinator loop
//!
//! One task owns all queue state. Requests from [`DownloadEngine`] handles
//! and output/exit messages from the supervised process arrive interleaved
//! on one mpsc channel, so state mutations are strictly serialized and an
//! exit message can never overtake the chunks the process emitted before it.
//!
//! [`DownloadEngine`]: super::DownloadEngine

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, JobError, Result};
use crate::progress;
use crate::supervisor::{ProcessExit, ProcessMessage, ToolProcess};
use crate::types::{Event, Job, JobId, JobSpec, JobStatus, Progress, QueueStats};

use super::invocation;

/// Request from a handle, with a oneshot reply slot.
pub(crate) enum Command {
    Add {
        spec: JobSpec,
        reply: oneshot::Sender<Result<JobId>>,
    },
    Remove {
        id: JobId,
        reply: oneshot::Sender<Result<()>>,
    },
    Clear {
        reply: oneshot::Sender<Result<usize>>,
    },
    Start {
        reply: oneshot::Sender<Result<bool>>,
    },
    Stop {
        reply: oneshot::Sender<Result<bool>>,
    },
    AbortActive {
        reply: oneshot::Sender<Result<JobId>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Job>>,
    },
    GetJob {
        id: JobId,
        reply: oneshot::Sender<Option<Job>>,
    },
    Stats {
        reply: oneshot::Sender<QueueStats>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Everything that arrives at the coordinator.
pub(crate) enum EngineMsg {
    Command(Command),
    /// Output or exit from the process supervising job `id`.
    Process { id: JobId, msg: ProcessMessage },
}

/// Why the active process was asked to terminate.
///
/// Recorded at cancel time so the eventual exit can be classified by what
/// the user meant, not guessed from the exit code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CancelIntent {
    /// `stop()`: the job returns to Pending for a later run.
    StopQueue,
    /// `abort_active()` or shutdown: the job is terminally Aborted.
    AbortJob,
}

struct ActiveJob {
    id: JobId,
    process: ToolProcess,
    intent: Option<CancelIntent>,
}

struct Coordinator {
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
    /// Upgraded per activation so the forwarder can land process messages
    /// on our channel. Held weak: when every handle is gone the channel
    /// closes and the coordinator stops instead of running forever.
    engine_tx: mpsc::WeakSender<EngineMsg>,
    jobs: Vec<Job>,
    next_id: u64,
    processing: bool,
    active: Option<ActiveJob>,
    shutting_down: bool,
    shutdown_replies: Vec<oneshot::Sender<()>>,
}

pub(crate) async fn run(
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
    engine_tx: mpsc::WeakSender<EngineMsg>,
    mut rx: mpsc::Receiver<EngineMsg>,
) {
    let mut co = Coordinator {
        config,
        event_tx,
        engine_tx,
        jobs: Vec::new(),
        next_id: 1,
        processing: false,
        active: None,
        shutting_down: false,
        shutdown_replies: Vec::new(),
    };

    while let Some(msg) = rx.recv().await {
        match msg {
            EngineMsg::Command(cmd) => co.handle_command(cmd),
            EngineMsg::Process { id, msg } => co.handle_process(id, msg),
        }

        // shutdown waits for the active process to actually exit
        if co.shutting_down && co.active.is_none() {
            co.emit(Event::Shutdown);
            info!("engine shutdown complete");
            for reply in co.shutdown_replies.drain(..) {
                let _ = reply.send(());
            }
            break;
        }
    }
    debug!("coordinator stopped");
}

impl Coordinator {
    /// Emit an event to all subscribers. Dropped if nobody is listening.
    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Add { spec, reply } => {
                let _ = reply.send(self.add(spec));
            }
            Command::Remove { id, reply } => {
                let _ = reply.send(self.remove(id));
            }
            Command::Clear { reply } => {
                let _ = reply.send(self.clear());
            }
            Command::Start { reply } => {
                let _ = reply.send(self.start());
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.stop());
            }
            Command::AbortActive { reply } => {
                let _ = reply.send(self.abort_active());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.jobs.clone());
            }
            Command::GetJob { id, reply } => {
                let _ = reply.send(self.jobs.iter().find(|j| j.id == id).cloned());
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            Command::Shutdown { reply } => self.shutdown(reply),
        }
    }

    fn add(&mut self, spec: JobSpec) -> Result<JobId> {
        if self.shutting_down {
            return Err(Error::ShuttingDown);
        }
        let id = JobId(self.next_id);
        self.next_id += 1;
        info!(job_id = id.0, url = %spec.url, selector = %spec.selector, "job added");
        let url = spec.url.clone();
        self.jobs.push(Job::new(id, spec));
        self.emit(Event::JobAdded { id, url });
        Ok(id)
    }

    fn remove(&mut self, id: JobId) -> Result<()> {
        if self.active.as_ref().is_some_and(|a| a.id == id) {
            return Err(JobError::InvalidState {
                id: id.0,
                operation: "remove".to_string(),
                current_state: "active".to_string(),
            }
            .into());
        }
        let Some(pos) = self.jobs.iter().position(|j| j.id == id) else {
            return Err(JobError::NotFound { id: id.0 }.into());
        };
        self.jobs.remove(pos);
        info!(job_id = id.0, "job removed");
        self.emit(Event::JobRemoved { id });
        Ok(())
    }

    fn clear(&mut self) -> Result<usize> {
        if let Some(active) = &self.active {
            return Err(JobError::QueueBusy {
                id: active.id.0,
                operation: "clear".to_string(),
            }
            .into());
        }
        let removed = self.jobs.len();
        self.jobs.clear();
        info!(removed, "queue cleared");
        self.emit(Event::QueueCleared { removed });
        Ok(removed)
    }

    /// Begin advancing through pending jobs.
    ///
    /// Returns Ok(false) when already processing (no-op, reported).
    fn start(&mut self) -> Result<bool> {
        if self.shutting_down {
            return Err(Error::ShuttingDown);
        }
        if self.jobs.is_empty() {
            return Err(JobError::EmptyQueue.into());
        }
        if self.processing {
            return Ok(false);
        }
        self.processing = true;
        info!("queue processing started");
        self.emit(Event::QueueStarted);
        // a still-running process from a previous stop keeps its slot; the
        // queue advances when it exits
        if self.active.is_none() {
            self.activate_next();
        }
        Ok(true)
    }

    /// Stop advancing and return the active job, if any, to Pending.
    ///
    /// Returns Ok(false) when the queue was not processing.
    fn stop(&mut self) -> Result<bool> {
        if !self.processing {
            return Ok(false);
        }
        self.processing = false;
        info!("queue processing stopped");
        self.emit(Event::QueueStopped);
        if let Some(active) = &mut self.active {
            // do not downgrade an earlier abort request
            active.intent.get_or_insert(CancelIntent::StopQueue);
            active.process.cancel();
        }
        Ok(true)
    }

    /// Terminate just the active job, marking it Aborted on exit.
    fn abort_active(&mut self) -> Result<JobId> {
        let Some(active) = &mut self.active else {
            return Err(JobError::NoActiveJob.into());
        };
        active.intent = Some(CancelIntent::AbortJob);
        active.process.cancel();
        info!(job_id = active.id.0, "abort requested for active job");
        Ok(active.id)
    }

    fn shutdown(&mut self, reply: oneshot::Sender<()>) {
        info!("engine shutdown requested");
        self.shutting_down = true;
        self.processing = false;
        self.shutdown_replies.push(reply);
        if let Some(active) = &mut self.active {
            active.intent = Some(CancelIntent::AbortJob);
            active.process.cancel();
        }
    }

    fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total: self.jobs.len(),
            pending: 0,
            active: 0,
            completed: 0,
            aborted: 0,
            failed: 0,
            processing: self.processing,
        };
        for job in &self.jobs {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Active => stats.active += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Aborted => stats.aborted += 1,
                JobStatus::Failed { .. } => stats.failed += 1,
            }
        }
        stats
    }

    fn handle_process(&mut self, id: JobId, msg: ProcessMessage) {
        if !self.active.as_ref().is_some_and(|a| a.id == id) {
            // a message from a process whose job already left the active
            // slot, e.g. chunks still in flight after removal of the slot
            debug!(job_id = id.0, "dropping message from superseded process");
            return;
        }
        match msg {
            ProcessMessage::Chunk(text) => {
                if let Some(event) = progress::parse_progress(&text) {
                    if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
                        job.progress = Progress {
                            percent: event.percent,
                            message: event.message.clone(),
                        };
                    }
                    self.emit(Event::ProgressUpdated {
                        id,
                        percent: event.percent,
                        message: event.message,
                    });
                }
            }
            ProcessMessage::Exited(exit) => self.finish_active(id, exit),
        }
    }

    /// Classify the exit of the active job and advance the queue.
    fn finish_active(&mut self, id: JobId, exit: ProcessExit) {
        let Some(active) = self.active.take() else {
            return;
        };
        let status = match (exit, active.intent) {
            // a clean exit always wins, even over a pending cancel request
            (ProcessExit::Success, _) => JobStatus::Completed,
            (ProcessExit::CancelSignal, Some(CancelIntent::StopQueue)) => JobStatus::Pending,
            (ProcessExit::CancelSignal, _) => JobStatus::Aborted,
            (ProcessExit::Failure(code), _) => JobStatus::Failed { code: Some(code) },
            (ProcessExit::ReadError, _) => JobStatus::Failed { code: None },
        };
        info!(job_id = id.0, status = %status, "job finished");
        self.set_status(id, status);

        if self.shutting_down {
            return;
        }
        if self.processing {
            self.activate_next();
        }
    }

    fn set_status(&mut self, id: JobId, status: JobStatus) {
        let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) else {
            return;
        };
        job.status = status.clone();
        self.emit(Event::JobStatusChanged { id, status });
    }

    /// Spawn the first pending job in arrival order.
    ///
    /// A spawn failure marks that job Failed and moves on to the next
    /// pending one; when none remain, processing ends with QueueDrained.
    fn activate_next(&mut self) {
        // upgrade fails once every handle is gone; nothing can observe or
        // control this queue anymore, so it stops advancing
        let Some(forward_tx) = self.engine_tx.upgrade() else {
            self.processing = false;
            debug!("all engine handles dropped, not activating further jobs");
            return;
        };

        loop {
            let Some(pos) = self
                .jobs
                .iter()
                .position(|j| j.status == JobStatus::Pending)
            else {
                self.processing = false;
                info!("no pending jobs remain");
                self.emit(Event::QueueDrained);
                return;
            };

            let id = self.jobs[pos].id;
            let executable = self.config.ytdlp_executable();
            let args = invocation::build_args(&self.jobs[pos].spec, &self.config);
            debug!(job_id = id.0, executable = %executable.display(), ?args, "starting job");

            let (ptx, prx) = mpsc::channel(64);
            match ToolProcess::spawn(&executable, &args, ptx) {
                Ok(process) => {
                    if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
                        // stale progress from an earlier stopped run
                        job.progress = Progress::default();
                    }
                    self.set_status(id, JobStatus::Active);
                    self.active = Some(ActiveJob {
                        id,
                        process,
                        intent: None,
                    });
                    forward_process_messages(id, prx, forward_tx);
                    return;
                }
                Err(e) => {
                    warn!(job_id = id.0, error = %e, "spawn failed, marking job failed");
                    self.set_status(id, JobStatus::Failed { code: None });
                }
            }
        }
    }
}

/// Tag messages from one process with its job id and deliver them to the
/// coordinator channel.
fn forward_process_messages(
    id: JobId,
    mut rx: mpsc::Receiver<ProcessMessage>,
    tx: mpsc::Sender<EngineMsg>,
) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if tx.send(EngineMsg::Process { id, msg }).await.is_err() {
                break;
            }
        }
    });
}
