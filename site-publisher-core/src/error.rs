use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by hierarchy building and publishing.
///
/// Every variant aborts the job it occurred in. The job driver records the
/// failure and moves on to the next job; only `Connection` ends the run.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Local path missing or unreadable.
    #[error("cannot access local path {}: {source}", path.display())]
    PathAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The remote session could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A commit was rejected by the remote store or its transport.
    #[error("remote fault: {0}")]
    Remote(String),

    #[error("invalid destination: {0:?}")]
    InvalidDestination(String),

    #[error("invalid filter pattern {0:?}")]
    InvalidFilter(String),
}

pub type Result<T> = std::result::Result<T, PublishError>;

impl PublishError {
    pub fn path_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PublishError::PathAccess {
            path: path.into(),
            source,
        }
    }
}
