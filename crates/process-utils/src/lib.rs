//! Small process-related helpers shared across the workspace.

#[cfg(feature = "tokio")]
use std::{ffi::OsStr, process::ExitStatus, time::Duration};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}

/// Create a command for a long-lived child that the caller supervises.
///
/// stdin is closed and the child is killed if its handle is dropped without
/// being reaped, so a panicking or abandoned owner never leaks the process.
#[cfg(feature = "tokio")]
pub fn supervised_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio_command(program);
    cmd.stdin(std::process::Stdio::null()).kill_on_drop(true);
    cmd
}

/// Ask a child to exit.
///
/// Sends `SIGTERM` on unix. Other platforms have no polite equivalent, so the
/// child is killed outright. A child that already exited is not an error.
#[cfg(feature = "tokio")]
pub fn request_terminate(child: &mut tokio::process::Child) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let Some(pid) = child.id() else {
            return Ok(());
        };
        // SAFETY: the child has not been reaped yet (`id()` returned Some),
        // so the pid still refers to it.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        Err(err)
    }

    #[cfg(not(unix))]
    {
        match child.start_kill() {
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}

/// Terminate a child and reap it.
///
/// The child gets `grace` to exit after [`request_terminate`]; if it is still
/// running after that it is killed. The child is always waited on before this
/// returns, so no zombie is left behind.
#[cfg(feature = "tokio")]
pub async fn terminate_gracefully(
    child: &mut tokio::process::Child,
    grace: Duration,
) -> std::io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    if let Err(e) = request_terminate(child) {
        tracing::warn!(error = %e, "Failed to signal child process; killing it");
        child.kill().await?;
        return child.wait().await;
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "Child process ignored termination request; killing it"
            );
            child.kill().await?;
            child.wait().await
        }
    }
}
