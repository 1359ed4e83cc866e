//! Error types for Cascade.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown result type '{0}'")]
    UnknownResult(String),

    #[error("Unsupported configuration version {0}")]
    UnsupportedConfigVersion(u32),

    // Project errors
    #[error("No such project '{name}'. Did you mean '{suggestion}'?")]
    ProjectNotFound { name: String, suggestion: String },

    #[error("'{0}' is not buildable")]
    NotBuildable(String),

    #[error("No project specified")]
    NoProjectSpecified,

    // SCM / queue errors
    #[error("Polling {project} failed: {reason}")]
    PollFailed { project: String, reason: String },

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether this error came from an SCM poll.
    pub fn is_poll_failure(&self) -> bool {
        matches!(self, Error::PollFailed { .. })
    }
}
