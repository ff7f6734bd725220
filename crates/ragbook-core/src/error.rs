use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Failed to load index from {}: {reason}", path.display())]
    IndexLoad { path: PathBuf, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed {expected} output: {reason}")]
    MalformedOutput { expected: &'static str, reason: String },

    #[error("{service} service failed: {message}")]
    Upstream { service: &'static str, message: String, timed_out: bool },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream { service, message: message.into(), timed_out: false }
    }

    pub fn timeout(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream { service, message: message.into(), timed_out: true }
    }

    pub fn malformed(expected: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedOutput { expected, reason: reason.into() }
    }

    /// Stable name of the error kind, used in API responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::ResourceNotFound(_) => "ResourceNotFound",
            Self::IndexLoad { .. } => "IndexLoadFailure",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::MalformedOutput { .. } => "MalformedOutputError",
            Self::Upstream { .. } => "UpstreamServiceError",
            Self::Io(_) => "Io",
            Self::Operation(_) => "Operation",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
