//! Vault connection configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::disabled::DisabledStore;
use crate::error::{Result, VaultError};
use crate::http::HttpVault;
use crate::traits::SecretStore;

/// Environment variable consulted for a GitHub vault token.
pub const GITHUB_TOKEN_VAR: &str = "VAULT_AUTH_GITHUB_TOKEN";

/// An explicit snapshot of ambient environment variables.
///
/// Credential lookup takes this as an input parameter instead of reading the
/// process environment, so tests can inject values and nothing here mutates
/// global state.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot(BTreeMap<String, String>);

impl EnvSnapshot {
    /// Capture the current process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self(std::env::vars().collect())
    }

    /// An empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a single variable, consuming and returning the snapshot.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// How to authenticate against the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VaultAuth {
    /// Static token authentication.
    Token {
        /// The vault token.
        token: String,
    },

    /// GitHub personal-access-token authentication.
    ///
    /// When `token` is absent it is taken from the [`GITHUB_TOKEN_VAR`]
    /// entry of the environment snapshot.
    Github {
        /// Optional explicit GitHub token.
        token: Option<String>,
    },
}

/// Connection settings for the secret store.
///
/// An unset `url` means "no vault": [`VaultConfig::store`] then returns a
/// [`DisabledStore`] whose every operation fails with
/// [`VaultError::NotEnabled`], so callers treat the absence uniformly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Base URL of the vault, e.g. `https://vault.example.com:8200`.
    pub url: Option<String>,

    /// Authentication method; required when `url` is set.
    pub auth: Option<VaultAuth>,
}

impl VaultConfig {
    /// A configuration with no vault at all.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether opening a store would need a GitHub token that neither the
    /// configuration nor `env` supplies.
    ///
    /// Interactive callers use this to ask the operator for the token before
    /// calling [`VaultConfig::store`].
    #[must_use]
    pub fn needs_github_token(&self, env: &EnvSnapshot) -> bool {
        self.url.is_some()
            && matches!(self.auth, Some(VaultAuth::Github { token: None }))
            && env.get(GITHUB_TOKEN_VAR).is_none()
    }

    /// Open a session against the configured store.
    pub async fn store(&self, env: &EnvSnapshot) -> Result<Box<dyn SecretStore>> {
        let Some(url) = &self.url else {
            return Ok(Box::new(DisabledStore));
        };

        match &self.auth {
            Some(VaultAuth::Token { token }) => {
                Ok(Box::new(HttpVault::with_token(url, token.clone())?))
            }
            Some(VaultAuth::Github { token }) => {
                let token = token
                    .clone()
                    .or_else(|| env.get(GITHUB_TOKEN_VAR).map(str::to_owned))
                    .ok_or(VaultError::MissingGithubToken)?;
                let store = HttpVault::login_github(url, &token).await?;
                Ok(Box::new(store))
            }
            None => Err(VaultError::Config(
                "vault.auth.method is required when vault.addr is set".to_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_url_yields_disabled_store() {
        let config = VaultConfig::disabled();
        let store = config.store(&EnvSnapshot::empty()).await.unwrap();
        let err = store.read("secret/anything").await.unwrap_err();
        assert!(matches!(err, VaultError::NotEnabled));
    }

    #[tokio::test]
    async fn url_without_auth_method_is_an_error() {
        let config = VaultConfig {
            url: Some("http://localhost:8200".to_owned()),
            auth: None,
        };
        let err = config.store(&EnvSnapshot::empty()).await.unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }

    #[tokio::test]
    async fn github_auth_without_token_anywhere_is_an_error() {
        let config = VaultConfig {
            url: Some("http://localhost:8200".to_owned()),
            auth: Some(VaultAuth::Github { token: None }),
        };
        let err = config.store(&EnvSnapshot::empty()).await.unwrap_err();
        assert!(matches!(err, VaultError::MissingGithubToken));
    }

    #[test]
    fn github_token_need_tracks_config_and_environment() {
        let github = VaultConfig {
            url: Some("http://localhost:8200".to_owned()),
            auth: Some(VaultAuth::Github { token: None }),
        };
        assert!(github.needs_github_token(&EnvSnapshot::empty()));
        assert!(!github.needs_github_token(&EnvSnapshot::empty().with(GITHUB_TOKEN_VAR, "gh_abc")));

        let explicit = VaultConfig {
            url: Some("http://localhost:8200".to_owned()),
            auth: Some(VaultAuth::Github {
                token: Some("gh_abc".to_owned()),
            }),
        };
        assert!(!explicit.needs_github_token(&EnvSnapshot::empty()));
        assert!(!VaultConfig::disabled().needs_github_token(&EnvSnapshot::empty()));
    }

    #[test]
    fn env_snapshot_lookup() {
        let env = EnvSnapshot::empty().with(GITHUB_TOKEN_VAR, "gh_abc");
        assert_eq!(env.get(GITHUB_TOKEN_VAR), Some("gh_abc"));
        assert_eq!(env.get("OTHER"), None);
    }
}
