//! The secret-store collaborator trait.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;

/// A key/value secret store.
///
/// One secret lives at a `path` and holds a flat map of string keys to
/// string values. This is the narrow interface the rest of Asterism consumes;
/// authentication and transport live behind the implementation.
#[async_trait]
pub trait SecretStore: std::fmt::Debug + Send + Sync {
    /// Read the secret at `path`.
    ///
    /// Returns `None` when nothing exists at the path. A present path with a
    /// missing key is the caller's problem, not the store's.
    async fn read(&self, path: &str) -> Result<Option<BTreeMap<String, String>>>;
}
