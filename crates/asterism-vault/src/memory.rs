//! In-memory secret store for tests.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Result, VaultError};
use crate::traits::SecretStore;

/// A [`SecretStore`] backed by a plain in-memory map.
#[derive(Debug, Default)]
pub struct MemoryVault {
    secrets: RwLock<BTreeMap<String, BTreeMap<String, String>>>,
}

impl MemoryVault {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one key under a secret path, creating the path if needed.
    pub fn insert(
        &self,
        path: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        if let Ok(mut secrets) = self.secrets.write() {
            secrets
                .entry(path.into())
                .or_default()
                .insert(key.into(), value.into());
        }
    }
}

#[async_trait]
impl SecretStore for MemoryVault {
    async fn read(&self, path: &str) -> Result<Option<BTreeMap<String, String>>> {
        let secrets = self
            .secrets
            .read()
            .map_err(|_| VaultError::Config("lock poisoned".to_owned()))?;

        Ok(secrets.get(path).cloned())
    }
}
