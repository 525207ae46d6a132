//! Typed, path-addressed extraction from YAML documents.
//!
//! All configuration reads funnel through this module so that every missing
//! key, type mismatch, and enum violation is reported the same way, naming
//! the dotted path to the offending key.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};

/// Walk `doc` along `path`, treating null the same as absent.
///
/// Returns `Ok(None)` for an absent terminal when `optional`, otherwise a
/// [`ConfigError::MissingKey`] naming the path up to and including the
/// missing segment.
pub fn lookup<'a>(doc: &'a Value, path: &[&str], optional: bool) -> Result<Option<&'a Value>> {
    let mut current = doc;
    for (index, key) in path.iter().enumerate() {
        let next = current.as_mapping().and_then(|m| m.get(*key));
        match next {
            Some(value) if !value.is_null() => current = value,
            _ => {
                if optional {
                    return Ok(None);
                }
                return Err(ConfigError::MissingKey(dotted(&path[..=index])));
            }
        }
    }
    Ok(Some(current))
}

/// Whether a non-null value exists at `path`.
#[must_use]
pub fn contains(doc: &Value, path: &[&str]) -> bool {
    matches!(lookup(doc, path, true), Ok(Some(_)))
}

/// Required string at `path`.
pub fn string(doc: &Value, path: &[&str]) -> Result<String> {
    opt_string(doc, path)?.ok_or_else(|| ConfigError::MissingKey(dotted(path)))
}

/// Optional string at `path`.
pub fn opt_string(doc: &Value, path: &[&str]) -> Result<Option<String>> {
    match lookup(doc, path, true)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(mismatch(path, "string")),
    }
}

/// Required integer at `path`.
pub fn integer(doc: &Value, path: &[&str]) -> Result<i64> {
    opt_integer(doc, path)?.ok_or_else(|| ConfigError::MissingKey(dotted(path)))
}

/// Optional integer at `path`.
pub fn opt_integer(doc: &Value, path: &[&str]) -> Result<Option<i64>> {
    match lookup(doc, path, true)? {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| mismatch(path, "integer")),
        Some(_) => Err(mismatch(path, "integer")),
    }
}

/// Required port number at `path` (an integer in the u16 range).
pub fn port(doc: &Value, path: &[&str]) -> Result<u16> {
    let raw = integer(doc, path)?;
    u16::try_from(raw).map_err(|_| mismatch(path, "port number"))
}

/// Required boolean at `path`.
pub fn boolean(doc: &Value, path: &[&str]) -> Result<bool> {
    opt_boolean(doc, path)?.ok_or_else(|| ConfigError::MissingKey(dotted(path)))
}

/// Optional boolean at `path`.
pub fn opt_boolean(doc: &Value, path: &[&str]) -> Result<Option<bool>> {
    match lookup(doc, path, true)? {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(mismatch(path, "boolean")),
    }
}

/// Required mapping at `path`.
pub fn mapping<'a>(doc: &'a Value, path: &[&str]) -> Result<&'a Mapping> {
    opt_mapping(doc, path)?.ok_or_else(|| ConfigError::MissingKey(dotted(path)))
}

/// Optional mapping at `path`.
pub fn opt_mapping<'a>(doc: &'a Value, path: &[&str]) -> Result<Option<&'a Mapping>> {
    match lookup(doc, path, true)? {
        None => Ok(None),
        Some(Value::Mapping(m)) => Ok(Some(m)),
        Some(_) => Err(mismatch(path, "mapping")),
    }
}

/// Optional mapping of strings to scalars at `path`, with scalar values
/// rendered as strings (for environment-variable style maps, where
/// `PORT: 8080` is as acceptable as `PORT: "8080"`).
pub fn opt_string_map(doc: &Value, path: &[&str]) -> Result<Option<BTreeMap<String, String>>> {
    let Some(raw) = opt_mapping(doc, path)? else {
        return Ok(None);
    };

    let mut out = BTreeMap::new();
    for (key, value) in raw {
        let key = key
            .as_str()
            .ok_or_else(|| mismatch(path, "string-keyed mapping"))?;
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(ConfigError::TypeMismatch {
                    path: format!("{}.{key}", dotted(path)),
                    expected: "scalar",
                })
            }
        };
        out.insert(key.to_owned(), value);
    }
    Ok(Some(out))
}

/// Required string at `path` restricted to a fixed allowed set.
pub fn one_of(doc: &Value, path: &[&str], allowed: &'static [&'static str]) -> Result<String> {
    let value = string(doc, path)?;
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnum {
            path: dotted(path),
            value,
            allowed,
        })
    }
}

/// Mapping at `path` whose key set must equal `required` exactly, with all
/// values strings.
pub fn strict_string_map(
    doc: &Value,
    path: &[&str],
    required: &'static [&'static str],
) -> Result<BTreeMap<String, String>> {
    let raw = mapping(doc, path)?;

    let mut out = BTreeMap::new();
    for (key, value) in raw {
        let key = key.as_str().ok_or_else(|| strict(path, required))?;
        if !required.contains(&key) {
            return Err(strict(path, required));
        }
        let value = value.as_str().ok_or_else(|| ConfigError::TypeMismatch {
            path: format!("{}.{key}", dotted(path)),
            expected: "string",
        })?;
        out.insert(key.to_owned(), value.to_owned());
    }

    if out.len() != required.len() {
        return Err(strict(path, required));
    }
    Ok(out)
}

fn dotted(path: &[&str]) -> String {
    path.join(".")
}

fn mismatch(path: &[&str], expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        path: dotted(path),
        expected,
    }
}

fn strict(path: &[&str], required: &'static [&'static str]) -> ConfigError {
    ConfigError::StrictKeys {
        path: dotted(path),
        required,
    }
}
