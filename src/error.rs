//! Structural error taxonomy.
//!
//! These errors are reported synchronously to the caller that triggered
//! them. Per-task failures travel through [`crate::handle::CompletionHandle`]
//! as [`crate::task::TaskError`] instead and never show up here.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by scheduler construction, lifecycle, and submission.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A priority ordinal outside the declared levels was supplied.
    #[error("invalid priority ordinal {0}")]
    InvalidPriority(usize),

    /// A global scheduler instance is already live.
    #[error("scheduler already initialized")]
    AlreadyInitialized,

    /// The scheduler has been stopped; a stopped scheduler is terminal.
    #[error("scheduler is stopped")]
    Stopped,

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
