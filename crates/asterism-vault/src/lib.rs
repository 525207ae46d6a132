//! Secret resolution for Asterism deployments.
//!
//! Configuration values of the form `VAULT:path:key` are indirections into a
//! Vault key/value store. This crate provides the sentinel parsing, the
//! [`SecretStore`] trait behind which the store sits, and three backends:
//!
//! - [`HttpVault`]: the real thing, speaking Vault's KV v1 HTTP API with
//!   either static-token or GitHub authentication
//! - [`DisabledStore`]: returned when no store is configured; every read
//!   fails fast with [`VaultError::NotEnabled`] so callers never need to
//!   branch on "is vault configured"
//! - [`MemoryVault`]: in-memory backend for tests
//!
//! Credential material from the ambient environment is passed in explicitly
//! via [`EnvSnapshot`] rather than read (or scrubbed) from the process
//! environment at depth.

mod config;
mod disabled;
mod error;
mod http;
mod memory;
mod resolver;
mod traits;

pub use config::{EnvSnapshot, VaultAuth, VaultConfig, GITHUB_TOKEN_VAR};
pub use disabled::DisabledStore;
pub use error::{Result, VaultError};
pub use http::HttpVault;
pub use memory::MemoryVault;
pub use resolver::{resolve, resolve_map, resolve_opt, resolve_string, SENTINEL};
pub use traits::SecretStore;
