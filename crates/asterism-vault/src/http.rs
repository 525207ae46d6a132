//! HTTP client for Vault's KV v1 API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::info;

use crate::error::{Result, VaultError};
use crate::traits::SecretStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TOKEN_HEADER: &str = "X-Vault-Token";

#[derive(Deserialize)]
struct ReadResponse {
    data: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: LoginAuth,
}

#[derive(Deserialize)]
struct LoginAuth {
    client_token: String,
}

/// A live session against a Vault server.
#[derive(Debug, Clone)]
pub struct HttpVault {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpVault {
    /// Create a session from a static token.
    pub fn with_token(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(VaultError::Http)?;

        Ok(Self {
            client,
            base_url: normalise_url(url),
            token: token.into(),
        })
    }

    /// Create a session by logging in with a GitHub personal access token.
    pub async fn login_github(url: impl Into<String>, github_token: &str) -> Result<Self> {
        let base_url = normalise_url(url);
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(VaultError::Http)?;

        info!(url = %base_url, "authenticating with the vault using github");

        let login_url = format!("{base_url}/v1/auth/github/login");
        let response = client
            .post(&login_url)
            .json(&serde_json::json!({ "token": github_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VaultError::Auth(format!(
                "github login failed: {}",
                response.status()
            )));
        }

        let login: LoginResponse = response.json().await?;

        Ok(Self {
            client,
            base_url,
            token: login.auth.client_token,
        })
    }
}

#[async_trait]
impl SecretStore for HttpVault {
    async fn read(&self, path: &str) -> Result<Option<BTreeMap<String, String>>> {
        let url = format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'));
        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if response.status() == StatusCode::FORBIDDEN {
            return Err(VaultError::Auth(format!("read of '{path}' was denied")));
        }
        if !response.status().is_success() {
            return Err(VaultError::Auth(format!(
                "read of '{path}' failed: {}",
                response.status()
            )));
        }

        let body: ReadResponse = response.json().await?;
        let data = body
            .data
            .into_iter()
            .map(|(key, value)| {
                let value = match value.as_str() {
                    Some(s) => s.to_owned(),
                    None => value.to_string(),
                };
                (key, value)
            })
            .collect();

        Ok(Some(data))
    }
}

fn normalise_url(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_owned()
}
