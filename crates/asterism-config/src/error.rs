//! Error types for configuration resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while resolving a deployment configuration.
///
/// All of these are fatal and occur before any container-engine mutation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("failed to read {path}")]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid YAML, or not a mapping at the top.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// The file that was being parsed.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A required key is absent (or null).
    #[error("missing required configuration key: {0}")]
    MissingKey(String),

    /// A key is present but has the wrong type.
    #[error("expected {expected} for {path}")]
    TypeMismatch {
        /// Dotted path to the offending key.
        path: String,
        /// The expected type name.
        expected: &'static str,
    },

    /// An enum-valued key holds a value outside the allowed set.
    #[error("invalid value '{value}' for {path}: must be one of {allowed:?}")]
    InvalidEnum {
        /// Dotted path to the offending key.
        path: String,
        /// The value found.
        value: String,
        /// The allowed values.
        allowed: &'static [&'static str],
    },

    /// A strict map's key set does not exactly match the required set.
    #[error("{path} must contain exactly the keys {required:?}")]
    StrictKeys {
        /// Dotted path to the offending map.
        path: String,
        /// The required key set.
        required: &'static [&'static str],
    },

    /// The protected key appeared in an overlay or override fragment.
    #[error("'{0}' may not be modified in an overlay or override")]
    ProtectedKey(&'static str),

    /// An `--option` fragment is not of the form `key.path=value`.
    #[error("invalid override '{0}': expected key.path=value")]
    InvalidOverride(String),

    /// No public URL is derivable: not configured, no proxy, not dev mode.
    #[error("no public URL: set web.url, enable the proxy, or set web.dev_mode")]
    NoPublicUrl,

    /// A persisted configuration snapshot could not be decoded.
    #[error("persisted configuration is unreadable: {0}")]
    SnapshotDecode(String),
}
