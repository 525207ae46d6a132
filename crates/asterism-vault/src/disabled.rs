//! Sentinel store for deployments with no vault configured.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{Result, VaultError};
use crate::traits::SecretStore;

/// A store whose every operation fails fast with [`VaultError::NotEnabled`].
///
/// Handed out by [`crate::VaultConfig::store`] when no vault URL is set.
/// A configuration that contains no `VAULT:` sentinels never touches the
/// store, so the error surfaces exactly when a secret reference exists but
/// no vault does.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStore;

#[async_trait]
impl SecretStore for DisabledStore {
    async fn read(&self, _path: &str) -> Result<Option<BTreeMap<String, String>>> {
        Err(VaultError::NotEnabled)
    }
}
