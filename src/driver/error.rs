//! Driver construction errors.

use thiserror::Error;

/// Errors that can occur when building a [`Driver`](super::Driver).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Task launcher not specified. Call .launcher(..) or .tokio() before .build()")]
    MissingLauncher,

    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
