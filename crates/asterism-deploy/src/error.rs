//! Error type for deployment orchestration.

use asterism_config::ConfigError;
use asterism_engine::EngineError;
use asterism_vault::VaultError;

/// Error type for orchestration operations.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Configuration could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Secret resolution failed.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// A container engine operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Start refused: containers from this constellation already exist.
    #[error(
        "constellation {prefix} already has containers: {}; stop the constellation first",
        containers.join(", ")
    )]
    AlreadyRunning {
        /// Container prefix of the constellation.
        prefix: String,
        /// The containers found, whatever their state.
        containers: Vec<String>,
    },

    /// The server container exists but its configuration snapshot cannot
    /// be read back.
    #[error("persisted configuration in {container} is unreadable: {reason}")]
    PersistedConfigUnreadable {
        /// The server container.
        container: String,
        /// What went wrong reading or decoding it.
        reason: String,
    },

    /// Stop cannot proceed without `--force`.
    #[error("refusing to stop without force: {0}")]
    StopRequiresForce(String),

    /// An operation needs a running constellation and there is none.
    #[error("constellation {0} is not deployed")]
    NotDeployed(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DeployError>;
