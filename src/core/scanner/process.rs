// src/core/scanner/process.rs

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::core::error::AdapterFailure;

/// How long pipe readers may keep draining after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(2);
const READ_CHUNK: usize = 8 * 1024;

/// Everything needed to launch one external tool.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// File the tool is told to write its structured report to.
    pub report_path: PathBuf,
    pub timeout: Duration,
    /// Ceiling applied separately to stdout and stderr.
    pub output_limit: usize,
}

impl ToolInvocation {
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Text read from one pipe, cut at the configured ceiling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    pub text: String,
    pub truncated: bool,
}

/// How the child stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEnd {
    /// `code` is `None` when the process was terminated by a signal.
    Exited { code: Option<i32> },
    TimedOut(Duration),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ProcessRun {
    pub end: ProcessEnd,
    pub stdout: Capture,
    pub stderr: Capture,
    pub elapsed: Duration,
}

impl ProcessRun {
    pub fn truncated(&self) -> bool {
        self.stdout.truncated || self.stderr.truncated
    }
}

/// Spawns the tool and waits for it under a hard wall-clock timeout.
///
/// Only a failure to start the process is returned as `Err`; timeouts and
/// cancellation are reported through `ProcessEnd` together with whatever
/// output was captured before the child was killed.
pub async fn run_process(
    invocation: &ToolInvocation,
    cancel: &CancellationToken,
) -> Result<ProcessRun, AdapterFailure> {
    debug!(command = %invocation.command_line(), "Spawning external tool.");
    let started = Instant::now();

    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => AdapterFailure::ToolUnavailable {
                program: invocation.program.clone(),
                cause: e.to_string(),
            },
            _ => AdapterFailure::Launch {
                program: invocation.program.clone(),
                cause: e.to_string(),
            },
        })?;

    let stdout_reader = child
        .stdout
        .take()
        .map(|pipe| tokio::spawn(read_capped(pipe, invocation.output_limit)));
    let stderr_reader = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(read_capped(pipe, invocation.output_limit)));

    let end = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => ProcessEnd::Exited { code: status.code() },
            Err(e) => {
                error!(
                    program = %invocation.program,
                    error = %e,
                    "Failed to wait on child process."
                );
                ProcessEnd::Exited { code: None }
            }
        },
        _ = tokio::time::sleep(invocation.timeout) => {
            warn!(
                program = %invocation.program,
                timeout_secs = invocation.timeout.as_secs(),
                "Tool exceeded its time budget, killing it."
            );
            ProcessEnd::TimedOut(invocation.timeout)
        },
        _ = cancel.cancelled() => {
            warn!(program = %invocation.program, "Scan cancelled, killing tool.");
            ProcessEnd::Cancelled
        },
    };

    if !matches!(end, ProcessEnd::Exited { .. }) {
        if let Err(e) = child.kill().await {
            error!(program = %invocation.program, error = %e, "Failed to kill child process.");
        }
    }

    let stdout = collect(stdout_reader).await;
    let stderr = collect(stderr_reader).await;

    Ok(ProcessRun {
        end,
        stdout,
        stderr,
        elapsed: started.elapsed(),
    })
}

/// Reads a pipe to EOF, keeping at most `limit` bytes. The rest is drained
/// and dropped so the child never blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> Capture {
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
                if n > room {
                    truncated = true;
                }
            }
            Err(e) => {
                warn!(error = %e, "Error reading tool output.");
                break;
            }
        }
    }
    Capture {
        text: String::from_utf8_lossy(&kept).into_owned(),
        truncated,
    }
}

// Grandchildren can keep a pipe open after the tool itself died.
async fn collect(reader: Option<JoinHandle<Capture>>) -> Capture {
    let Some(handle) = reader else {
        return Capture::default();
    };
    let abort = handle.abort_handle();
    match tokio::time::timeout(DRAIN_GRACE, handle).await {
        Ok(Ok(capture)) => capture,
        Ok(Err(e)) => {
            warn!(error = %e, "Output reader task failed.");
            Capture::default()
        }
        Err(_) => {
            abort.abort();
            debug!("Output pipe still open after the tool exited, giving up on it.");
            Capture::default()
        }
    }
}
