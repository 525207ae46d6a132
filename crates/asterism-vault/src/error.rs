//! Error types for secret resolution.

use thiserror::Error;

/// Result type alias using [`VaultError`].
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors that can occur while resolving secrets.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No vault is configured but something tried to read from it.
    #[error("vault access is not enabled (set vault.addr to enable)")]
    NotEnabled,

    /// A sentinel-prefixed value did not match `VAULT:path:key`.
    #[error("invalid vault accessor '{0}': expected VAULT:path:key")]
    InvalidAccessor(String),

    /// No secret exists at the requested path.
    #[error("did not find secret at '{path}'")]
    SecretNotFound {
        /// The path that was read.
        path: String,
    },

    /// The secret exists but lacks the requested key.
    #[error("did not find key '{key}' at secret path '{path}'")]
    SecretKeyNotFound {
        /// The missing key.
        key: String,
        /// The path that was read.
        path: String,
    },

    /// GitHub authentication was selected but no token is available.
    #[error("no GitHub token for vault: set {var} or vault.auth.args.token", var = crate::GITHUB_TOKEN_VAR)]
    MissingGithubToken,

    /// The vault section of the configuration is inconsistent.
    #[error("vault configuration error: {0}")]
    Config(String),

    /// Authentication against the vault failed.
    #[error("vault authentication failed: {0}")]
    Auth(String),

    /// Transport-level error talking to the vault.
    #[error("vault request failed: {0}")]
    Http(#[from] reqwest::Error),
}
