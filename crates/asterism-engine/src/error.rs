//! Error type for container engine operations.

use std::time::Duration;

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No usable container engine binary on this host.
    #[error("container engine unavailable: {0}")]
    Unavailable(String),

    /// An engine command exited non-zero.
    #[error("{action} failed: {stderr}")]
    Command {
        /// What was being attempted, e.g. `network create`.
        action: String,
        /// Trimmed stderr of the failed command.
        stderr: String,
    },

    /// The named object does not exist.
    #[error("no such object: {0}")]
    NotFound(String),

    /// A container did not reach the running state in time.
    #[error("container {name} not running after {timeout:?}")]
    StartTimeout {
        /// Container name.
        name: String,
        /// How long we waited.
        timeout: Duration,
    },

    /// A container exited while we were waiting for it to come up.
    #[error("container {name} exited unexpectedly during start")]
    UnexpectedExit {
        /// Container name.
        name: String,
    },

    /// A readiness probe did not succeed in time.
    #[error("container {name} failed probe `{probe}` after {timeout:?}")]
    ProbeTimeout {
        /// Container name.
        name: String,
        /// The probe command.
        probe: String,
        /// How long we waited.
        timeout: Duration,
    },

    /// Spawning or talking to the engine process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn command(action: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Command {
            action: action.into(),
            stderr: stderr.into(),
        }
    }
}
