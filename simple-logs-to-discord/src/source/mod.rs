//! Log sources.
//!
//! A source supervises one external process and hands its output back one
//! line at a time. Two kinds exist:
//! - a followed file (`tail -F -n 0 <path>`), which only sees lines appended
//!   after startup
//! - a followed container (`docker logs -f --since 0s <name>`), with the
//!   runtime's stderr merged into the same stream
//!
//! The process is started when the source is opened and is terminated by
//! [`LineSource::close`]. Dropping an unclosed source still sends the child
//! SIGTERM and reaps it in the background.

mod codec;
mod process;

pub use codec::{LogLineCodec, MAX_LINE_BYTES};
pub use process::{CommandSpec, ProcessLineSource, TERMINATE_GRACE};

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::Result;

/// Prefix that selects container mode in a source string.
pub const CONTAINER_PREFIX: &str = "docker:";

/// Where log lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    File(PathBuf),
    Container(String),
}

impl SourceDescriptor {
    /// Parse a source string: `docker:<name>` is a container, anything else a
    /// file path. The container name is not validated here.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(CONTAINER_PREFIX) {
            Some(name) => Self::Container(name.to_string()),
            None => Self::File(PathBuf::from(raw)),
        }
    }

    /// Human-readable mode, used in startup notices.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Container(_) => "docker",
        }
    }

    /// Command that follows this source from the current moment on.
    pub fn command(&self) -> CommandSpec {
        match self {
            Self::File(path) => CommandSpec::new("tail")
                .arg("-F")
                .arg("-n")
                .arg("0")
                .arg(path.as_os_str()),
            Self::Container(name) => CommandSpec::new("docker")
                .args(["logs", "-f", "--since", "0s"])
                .arg(name)
                .merge_stderr(true),
        }
    }
}

/// Renders back to the configured source string.
impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Container(name) => write!(f, "{CONTAINER_PREFIX}{name}"),
        }
    }
}

/// A pull-based sequence of log lines backed by a live process.
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next line. `None` means the stream has ended and every
    /// later call will also return `None`.
    async fn next_line(&mut self) -> Option<String>;

    /// Stop the backing process and wait for it to exit.
    ///
    /// Safe to call more than once; only the first call does any work.
    async fn close(&mut self) -> Result<()>;
}

/// Start following `descriptor`.
///
/// Fails immediately if the process cannot be spawned.
pub fn open_source(descriptor: &SourceDescriptor) -> Result<Box<dyn LineSource>> {
    match descriptor {
        SourceDescriptor::File(path) => {
            tracing::info!(kind = descriptor.kind(), "Watching file: {}", path.display());
        }
        SourceDescriptor::Container(name) => {
            tracing::info!(kind = descriptor.kind(), "Watching docker container: {}", name);
        }
    }

    let source = ProcessLineSource::spawn(descriptor.command(), descriptor.to_string())?;
    Ok(Box::new(source))
}
