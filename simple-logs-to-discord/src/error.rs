//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {}", .0.join("; "))]
    Configuration(Vec<String>),

    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Individual problems carried by a configuration error.
    pub fn config_problems(&self) -> Option<&[String]> {
        match self {
            Self::Configuration(problems) => Some(problems),
            _ => None,
        }
    }
}
