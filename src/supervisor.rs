//! Process supervision for one external tool invocation
//!
//! A [`ToolProcess`] owns exactly one spawned yt-dlp process. Two reader
//! tasks stream its stdout and stderr as text chunks, and a supervising task
//! waits for exit, joining the readers first so the terminal
//! [`ProcessMessage::Exited`] is always delivered after every chunk already
//! in flight. All messages go through the single mpsc sender handed to
//! [`ToolProcess::spawn`].

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Classified terminal outcome of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exit code 0 with streams read cleanly.
    Success,
    /// Terminated by the cancellation signal (SIGTERM or exit code 15).
    CancelSignal,
    /// Any other non-zero exit, with the raw code (negated signal number on
    /// unix when killed by a signal other than SIGTERM).
    Failure(i32),
    /// The process exited cleanly but an output stream could not be read,
    /// so reported progress may be incomplete.
    ReadError,
}

/// Message from a supervised process to its consumer.
#[derive(Debug)]
pub enum ProcessMessage {
    /// One burst of combined stdout/stderr text, in per-stream arrival order.
    Chunk(String),
    /// Terminal status. Sent exactly once, after all chunks.
    Exited(ProcessExit),
}

/// Handle to one running external process.
///
/// Dropping the handle does not kill the process; the supervising task keeps
/// running until exit. Use [`cancel`] to request termination.
///
/// [`cancel`]: ToolProcess::cancel
#[derive(Debug)]
pub struct ToolProcess {
    cancel: CancellationToken,
}

impl ToolProcess {
    /// Spawn `executable` with `args`, streaming output and exit status to
    /// `tx`.
    ///
    /// A spawn failure is returned synchronously and nothing is ever sent
    /// on `tx`.
    pub fn spawn(
        executable: &Path,
        args: &[String],
        tx: mpsc::Sender<ProcessMessage>,
    ) -> Result<Self> {
        let mut child = Command::new(executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                executable: executable.to_path_buf(),
                source,
            })?;

        debug!(pid = child.id(), executable = %executable.display(), "process spawned");

        // stdout/stderr are always piped above, so both takes succeed
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_task = tokio::spawn(pump(stdout, tx.clone()));
        let err_task = tokio::spawn(pump(stderr, tx.clone()));

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            let mut cancelled = false;
            let status = loop {
                tokio::select! {
                    _ = token.cancelled(), if !cancelled => {
                        cancelled = true;
                        terminate(&mut child);
                    }
                    status = child.wait() => break status,
                }
            };

            // join readers first so Exited strictly follows all chunks
            let read_failed = matches!(out_task.await, Ok(true))
                || matches!(err_task.await, Ok(true));

            let exit = match status {
                Ok(status) => classify(status, read_failed),
                Err(e) => {
                    warn!(error = %e, "failed to collect process exit status");
                    ProcessExit::ReadError
                }
            };
            debug!(?exit, "process exited");
            let _ = tx.send(ProcessMessage::Exited(exit)).await;
        });

        Ok(Self { cancel })
    }

    /// Request graceful termination with SIGTERM.
    ///
    /// Idempotent; calling it again, or after the process has exited, is a
    /// no-op. The [`ProcessMessage::Exited`] message still fires exactly
    /// once when the process actually exits.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Stream one pipe as text chunks. Returns true when reading failed.
async fn pump(
    stream: Option<impl AsyncRead + Unpin + Send + 'static>,
    tx: mpsc::Sender<ProcessMessage>,
) -> bool {
    let Some(mut stream) = stream else {
        return false;
    };
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => return false,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                if tx.send(ProcessMessage::Chunk(text)).await.is_err() {
                    // consumer went away, drain silently
                    return false;
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to read process output stream");
                return true;
            }
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: plain signal delivery to a pid we own
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.start_kill();
}

fn classify(status: std::process::ExitStatus, read_failed: bool) -> ProcessExit {
    if let Some(code) = status.code() {
        return match code {
            0 if read_failed => ProcessExit::ReadError,
            0 => ProcessExit::Success,
            15 | -15 => ProcessExit::CancelSignal,
            c => ProcessExit::Failure(c),
        };
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return if signal == libc::SIGTERM {
                ProcessExit::CancelSignal
            } else {
                ProcessExit::Failure(-signal)
            };
        }
    }

    ProcessExit::Failure(-1)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    /// Drain the channel, returning all chunks and the terminal exit.
    async fn collect(mut rx: mpsc::Receiver<ProcessMessage>) -> (Vec<String>, ProcessExit) {
        let mut chunks = Vec::new();
        let mut exit = None;
        while let Some(msg) = rx.recv().await {
            match msg {
                ProcessMessage::Chunk(text) => {
                    assert!(exit.is_none(), "chunk arrived after exit message");
                    chunks.push(text);
                }
                ProcessMessage::Exited(status) => {
                    assert!(exit.is_none(), "exit message delivered more than once");
                    exit = Some(status);
                }
            }
        }
        (chunks, exit.expect("no exit message delivered"))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_output_then_reports_success() {
        let (tx, rx) = mpsc::channel(32);
        ToolProcess::spawn(&sh(), &args("printf hello; printf ' world' >&2"), tx).unwrap();

        let (chunks, exit) = collect(rx).await;
        assert_eq!(exit, ProcessExit::Success);
        let combined: String = chunks.concat();
        assert!(combined.contains("hello"), "stdout chunk missing: {combined:?}");
        assert!(combined.contains("world"), "stderr chunk missing: {combined:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_maps_to_failure_with_code() {
        let (tx, rx) = mpsc::channel(8);
        ToolProcess::spawn(&sh(), &args("exit 3"), tx).unwrap();
        let (_, exit) = collect(rx).await;
        assert_eq!(exit, ProcessExit::Failure(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_fifteen_maps_to_cancel_signal() {
        let (tx, rx) = mpsc::channel(8);
        ToolProcess::spawn(&sh(), &args("exit 15"), tx).unwrap();
        let (_, exit) = collect(rx).await;
        assert_eq!(exit, ProcessExit::CancelSignal);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_terminates_and_reports_cancel_signal() {
        let (tx, rx) = mpsc::channel(8);
        let process = ToolProcess::spawn(&sh(), &args("sleep 30"), tx).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        process.cancel();
        // idempotent, second request is a no-op
        process.cancel();

        let (_, exit) = collect(rx).await;
        assert_eq!(exit, ProcessExit::CancelSignal);
    }

    #[tokio::test]
    async fn missing_executable_fails_synchronously() {
        let (tx, mut rx) = mpsc::channel(8);
        let result = ToolProcess::spawn(
            Path::new("/nonexistent/yt-dlp-test-binary"),
            &[],
            tx,
        );
        assert!(matches!(result, Err(Error::Spawn { .. })));
        // spawn failure means nothing was ever sent and the channel is closed
        assert!(rx.recv().await.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn classify_table() {
        use std::os::unix::process::ExitStatusExt as _;
        {
            let ok = std::process::ExitStatus::from_raw(0);
            assert_eq!(classify(ok, false), ProcessExit::Success);
            assert_eq!(classify(ok, true), ProcessExit::ReadError);

            // raw wait status: high byte is the exit code
            let code3 = std::process::ExitStatus::from_raw(3 << 8);
            assert_eq!(classify(code3, false), ProcessExit::Failure(3));

            let code15 = std::process::ExitStatus::from_raw(15 << 8);
            assert_eq!(classify(code15, false), ProcessExit::CancelSignal);

            let sigterm = std::process::ExitStatus::from_raw(15);
            assert_eq!(classify(sigterm, false), ProcessExit::CancelSignal);

            let sigkill = std::process::ExitStatus::from_raw(9);
            assert_eq!(classify(sigkill, false), ProcessExit::Failure(-9));
        }
    }
}
