//! Sentinel parsing and in-place secret resolution.

use std::collections::BTreeMap;

use crate::error::{Result, VaultError};
use crate::traits::SecretStore;

/// Prefix marking a value as a secret reference.
pub const SENTINEL: &str = "VAULT:";

/// Resolve a single value against the store.
///
/// A value that does not start with [`SENTINEL`] is returned unchanged with
/// `false`. Otherwise the accessor is parsed as `VAULT:path:key`, the path
/// is read, and the value at `key` is returned with `true`.
pub async fn resolve(value: &str, store: &dyn SecretStore) -> Result<(bool, String)> {
    if !value.starts_with(SENTINEL) {
        return Ok((false, value.to_owned()));
    }

    let (path, key) = parse_accessor(value)?;
    let data = store
        .read(path)
        .await?
        .ok_or_else(|| VaultError::SecretNotFound {
            path: path.to_owned(),
        })?;

    match data.get(key) {
        Some(resolved) => Ok((true, resolved.clone())),
        None => Err(VaultError::SecretKeyNotFound {
            key: key.to_owned(),
            path: path.to_owned(),
        }),
    }
}

/// Resolve a string field in place.
pub async fn resolve_string(field: &mut String, store: &dyn SecretStore) -> Result<()> {
    let (was_secret, resolved) = resolve(field, store).await?;
    if was_secret {
        *field = resolved;
    }
    Ok(())
}

/// Resolve an optional string field in place.
pub async fn resolve_opt(field: &mut Option<String>, store: &dyn SecretStore) -> Result<()> {
    if let Some(value) = field {
        resolve_string(value, store).await?;
    }
    Ok(())
}

/// Resolve every value of a string map in place.
pub async fn resolve_map(
    map: &mut BTreeMap<String, String>,
    store: &dyn SecretStore,
) -> Result<()> {
    for value in map.values_mut() {
        resolve_string(value, store).await?;
    }
    Ok(())
}

fn parse_accessor(value: &str) -> Result<(&str, &str)> {
    let rest = &value[SENTINEL.len()..];
    match rest.split(':').collect::<Vec<_>>()[..] {
        [path, key] if !path.is_empty() && !key.is_empty() => Ok((path, key)),
        _ => Err(VaultError::InvalidAccessor(value.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVault;

    fn store() -> MemoryVault {
        let vault = MemoryVault::new();
        vault.insert("secret/app", "password", "s3cret");
        vault
    }

    #[tokio::test]
    async fn non_sentinel_values_pass_through() {
        let vault = store();
        let (was_secret, value) = resolve("plain-value", &vault).await.unwrap();
        assert!(!was_secret);
        assert_eq!(value, "plain-value");
    }

    #[tokio::test]
    async fn resolution_is_idempotent_on_plain_input() {
        let vault = store();
        let (_, once) = resolve("hello", &vault).await.unwrap();
        let (was_secret, twice) = resolve(&once, &vault).await.unwrap();
        assert!(!was_secret);
        assert_eq!(twice, "hello");
    }

    #[tokio::test]
    async fn sentinel_values_are_fetched() {
        let vault = store();
        let (was_secret, value) = resolve("VAULT:secret/app:password", &vault).await.unwrap();
        assert!(was_secret);
        assert_eq!(value, "s3cret");
    }

    #[tokio::test]
    async fn malformed_accessor_fails() {
        let vault = store();
        for bad in ["VAULT:", "VAULT:only-path", "VAULT:a:b:c", "VAULT::key"] {
            let err = resolve(bad, &vault).await.unwrap_err();
            assert!(matches!(err, VaultError::InvalidAccessor(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn missing_path_and_missing_key_are_distinct() {
        let vault = store();

        let err = resolve("VAULT:secret/absent:key", &vault).await.unwrap_err();
        assert!(matches!(err, VaultError::SecretNotFound { .. }));

        let err = resolve("VAULT:secret/app:absent", &vault).await.unwrap_err();
        assert!(matches!(err, VaultError::SecretKeyNotFound { .. }));
    }

    #[tokio::test]
    async fn map_values_resolve_in_place() {
        let vault = store();
        let mut map = BTreeMap::new();
        map.insert("DB_PASSWORD".to_owned(), "VAULT:secret/app:password".to_owned());
        map.insert("DB_HOST".to_owned(), "localhost".to_owned());

        resolve_map(&mut map, &vault).await.unwrap();

        assert_eq!(map.get("DB_PASSWORD").map(String::as_str), Some("s3cret"));
        assert_eq!(map.get("DB_HOST").map(String::as_str), Some("localhost"));
    }
}
