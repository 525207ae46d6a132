//! Deep merge of configuration documents.

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};

/// The one key an overlay or override may never touch: it is the immutable
/// identity of a deployment instance.
pub const PROTECTED_KEY: &str = "container_prefix";

/// Recursively merge `overlay` into `base`.
///
/// Where both sides hold mappings the merge recurses; any other overlay
/// value, including null, replaces the base value wholesale. Null replacing
/// a nested mapping deletes it rather than merging into it, which is how an
/// overlay switches a feature section off.
pub fn combine(base: &mut Mapping, overlay: &Mapping) {
    for (key, value) in overlay {
        let merged = match (base.get_mut(key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                combine(existing, incoming);
                true
            }
            _ => false,
        };
        if !merged {
            base.insert(key.clone(), value.clone());
        }
    }
}

/// Fold override fragments left-to-right into a single document.
#[must_use]
pub fn collapse(fragments: &[Mapping]) -> Mapping {
    let mut folded = Mapping::new();
    for fragment in fragments {
        combine(&mut folded, fragment);
    }
    folded
}

/// Fail if the protected key appears at the top level of `doc`.
pub fn check_protected(doc: &Mapping) -> Result<()> {
    if doc.contains_key(PROTECTED_KEY) {
        Err(ConfigError::ProtectedKey(PROTECTED_KEY))
    } else {
        Ok(())
    }
}

/// Merge an optional overlay and any override fragments into `base`.
///
/// Every overlay and fragment is checked for the protected key first; a
/// violation aborts before any merge happens, so `base` is never partially
/// updated.
pub fn apply(base: &mut Mapping, overlay: Option<&Mapping>, fragments: &[Mapping]) -> Result<()> {
    if let Some(overlay) = overlay {
        check_protected(overlay)?;
    }
    for fragment in fragments {
        check_protected(fragment)?;
    }

    if let Some(overlay) = overlay {
        combine(base, overlay);
    }
    if !fragments.is_empty() {
        let folded = collapse(fragments);
        combine(base, &folded);
    }
    Ok(())
}
