use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::AsyncRead;
use tokio::process::Child;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use super::LineSource;
use super::codec::LogLineCodec;
use crate::{Error, Result};

/// How long a child gets to exit after SIGTERM before it is killed.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Program and arguments for a line-producing process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<OsString>,
    merge_stderr: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            merge_stderr: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Emit the child's stderr as lines too, instead of discarding it.
    pub fn merge_stderr(mut self, merge: bool) -> Self {
        self.merge_stderr = merge;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    pub fn merges_stderr(&self) -> bool {
        self.merge_stderr
    }
}

/// A [`LineSource`] reading the output of one supervised child process.
pub struct ProcessLineSource {
    label: String,
    child: Option<Child>,
    lines: BoxStream<'static, std::io::Result<String>>,
    finished: bool,
}

impl fmt::Debug for ProcessLineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessLineSource")
            .field("label", &self.label)
            .field("pid", &self.child.as_ref().and_then(Child::id))
            .field("finished", &self.finished)
            .finish()
    }
}

impl ProcessLineSource {
    /// Spawn the process described by `spec` and start reading its output.
    pub fn spawn(spec: CommandSpec, label: String) -> Result<Self> {
        let mut command = process_utils::supervised_command(&spec.program);
        command.args(&spec.args);

        let shared = if spec.merge_stderr {
            share_output_pipe(&mut command)?
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::null());
            None
        };

        let mut child = command
            .spawn()
            .map_err(|e| Error::spawn(spec.program.clone(), e))?;
        // The command still holds our copies of the shared pipe's write end;
        // the reader only sees EOF once they are closed.
        drop(command);

        let lines = match shared {
            Some(lines) => lines,
            None => piped_output(&mut child, &spec.program)?,
        };

        debug!(
            source = %label,
            program = %spec.program,
            args = ?spec.args_lossy(),
            pid = child.id(),
            "Log source process started"
        );

        Ok(Self {
            label,
            child: Some(child),
            lines,
            finished: false,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the child has been terminated and reaped.
    pub fn is_closed(&self) -> bool {
        self.child.is_none()
    }
}

#[async_trait]
impl LineSource for ProcessLineSource {
    async fn next_line(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        match self.lines.next().await {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                warn!(source = %self.label, error = %e, "Failed to read from log source");
                self.finished = true;
                None
            }
            None => {
                info!(source = %self.label, "Log source stream ended");
                self.finished = true;
                None
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        self.finished = true;
        // Release our end of the pipes so a child blocked on write can exit.
        self.lines = stream::empty().boxed();

        let status = process_utils::terminate_gracefully(&mut child, TERMINATE_GRACE).await?;
        info!(source = %self.label, %status, "Log source process exited");
        Ok(())
    }
}

impl Drop for ProcessLineSource {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let label = std::mem::take(&mut self.label);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(source = %label, "Log source dropped without close; terminating process");
                handle.spawn(async move {
                    match process_utils::terminate_gracefully(&mut child, TERMINATE_GRACE).await {
                        Ok(status) => {
                            info!(source = %label, %status, "Log source process exited");
                        }
                        Err(e) => {
                            warn!(source = %label, error = %e, "Failed to stop log source");
                        }
                    }
                });
            }
            Err(_) => {
                // No runtime to reap on; kill_on_drop follows the signal.
                if let Err(e) = process_utils::request_terminate(&mut child) {
                    warn!(source = %label, error = %e, "Failed to signal log source process");
                }
            }
        }
    }
}

/// Point stdout and stderr at one pipe so lines from both keep the order
/// they were written in.
#[cfg(unix)]
fn share_output_pipe(
    command: &mut tokio::process::Command,
) -> Result<Option<BoxStream<'static, std::io::Result<String>>>> {
    let (reader, writer) = std::io::pipe()?;
    command.stdout(writer.try_clone()?).stderr(writer);
    let receiver = tokio::net::unix::pipe::Receiver::from_owned_fd(reader.into())?;
    Ok(Some(line_stream(receiver)))
}

/// Without a shareable pipe, both streams are piped separately and merged by
/// [`piped_output`].
#[cfg(not(unix))]
fn share_output_pipe(
    command: &mut tokio::process::Command,
) -> Result<Option<BoxStream<'static, std::io::Result<String>>>> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    Ok(None)
}

/// Lines from the child's own stdout, plus stderr if it was piped too.
fn piped_output(
    child: &mut Child,
    program: &str,
) -> Result<BoxStream<'static, std::io::Result<String>>> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Other(format!("Failed to capture {program} stdout")))?;

    Ok(match child.stderr.take() {
        Some(stderr) => stream::select(line_stream(stdout), line_stream(stderr)).boxed(),
        None => line_stream(stdout),
    })
}

/// Read `reader` as a stream of [`LogLineCodec`] lines.
fn line_stream<R>(reader: R) -> BoxStream<'static, std::io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    FramedRead::new(reader, LogLineCodec::default()).boxed()
}
