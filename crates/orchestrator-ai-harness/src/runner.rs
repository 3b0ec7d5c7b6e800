//! Process runner seam and the tokio-backed implementation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::errors::TransportError;

const READ_CHUNK: usize = 8 * 1024;

/// Everything needed to launch one backend process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
    pub timeout: Duration,
    /// Wait between the graceful terminate signal and the forced kill.
    pub kill_grace: Duration,
}

/// Captured result of a process that ran to exit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `-1` when the process was ended by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Incremental output callbacks, invoked in arrival order.
pub trait OutputObserver: Send {
    fn on_stdout(&mut self, chunk: &[u8]);

    fn on_stderr(&mut self, _chunk: &[u8]) {}
}

/// Observer that ignores live output; the runner still captures everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl OutputObserver for PassThrough {
    fn on_stdout(&mut self, _chunk: &[u8]) {}
}

/// Launches a process, streams its output to an observer and resolves to the
/// captured output. Timeouts and spawn failures are transport errors; a
/// non-zero exit code is reported in [`ProcessOutput`] and judged by the caller.
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        spec: ProcessSpec,
        observer: &mut dyn OutputObserver,
    ) -> Result<ProcessOutput, TransportError>;
}

/// [`ProcessRunner`] on top of `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait::async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        spec: ProcessSpec,
        observer: &mut dyn OutputObserver,
    ) -> Result<ProcessOutput, TransportError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let mut child = command
            .spawn()
            .map_err(|e| TransportError::spawn(&spec.program, &e))?;
        debug!(program = %spec.program, pid = ?child.id(), "spawned backend process");

        if let (Some(input), Some(mut stdin)) = (spec.stdin, child.stdin.take()) {
            // Written from a separate task so a chatty child cannot deadlock us.
            tokio::spawn(async move {
                if let Err(err) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %err, "backend closed stdin early");
                    return;
                }
                if let Err(err) = stdin.shutdown().await {
                    debug!(error = %err, "failed to close backend stdin");
                }
            });
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::io("stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::io("stderr was not captured"))?;

        let deadline = tokio::time::sleep(spec.timeout);
        tokio::pin!(deadline);

        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let mut out_chunk = vec![0u8; READ_CHUNK];
        let mut err_chunk = vec![0u8; READ_CHUNK];
        let mut out_open = true;
        let mut err_open = true;

        let mut timed_out = false;
        while out_open || err_open {
            tokio::select! {
                read = stdout.read(&mut out_chunk), if out_open => match read {
                    Ok(0) => out_open = false,
                    Ok(n) => {
                        observer.on_stdout(&out_chunk[..n]);
                        out_buf.extend_from_slice(&out_chunk[..n]);
                    }
                    Err(err) => return Err(TransportError::io(err)),
                },
                read = stderr.read(&mut err_chunk), if err_open => match read {
                    Ok(0) => err_open = false,
                    Ok(n) => {
                        observer.on_stderr(&err_chunk[..n]);
                        err_buf.extend_from_slice(&err_chunk[..n]);
                    }
                    Err(err) => return Err(TransportError::io(err)),
                },
                () = &mut deadline => {
                    timed_out = true;
                    break;
                }
            }
        }

        let status = if timed_out {
            None
        } else {
            tokio::select! {
                status = child.wait() => Some(status.map_err(TransportError::io)?),
                () = &mut deadline => None,
            }
        };

        let Some(status) = status else {
            warn!(program = %spec.program, timeout_secs = spec.timeout.as_secs(), "backend process timed out; terminating");
            terminate(&mut child, spec.kill_grace).await;
            return Err(TransportError::Timeout {
                after: spec.timeout,
                stderr: String::from_utf8_lossy(&err_buf).into_owned(),
            });
        };

        Ok(ProcessOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out_buf).into_owned(),
            stderr: String::from_utf8_lossy(&err_buf).into_owned(),
        })
    }
}

/// SIGTERM first, SIGKILL once the grace window passes.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok()
            && tokio::time::timeout(grace, child.wait()).await.is_ok()
        {
            return;
        }
    }
    #[cfg(not(unix))]
    let _ = grace;
    if let Err(err) = child.kill().await {
        warn!(error = %err, "failed to kill backend process");
    }
}
