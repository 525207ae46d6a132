//! Parsing of ad-hoc `--option key.path=value` override fragments.

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};

/// Parse one `key.path=value` string into a nested single-leaf document.
///
/// `web.port=8080` becomes `{web: {port: 8080}}`; the value is parsed as a
/// YAML scalar so integers and booleans come out typed rather than as
/// strings.
pub fn parse_fragment(spec: &str) -> Result<Mapping> {
    let (key, raw_value) = spec
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride(spec.to_owned()))?;

    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::InvalidOverride(spec.to_owned()));
    }

    let mut leaf = scalar(raw_value);
    for segment in segments.into_iter().rev() {
        let mut wrapper = Mapping::new();
        wrapper.insert(Value::from(segment), leaf);
        leaf = Value::Mapping(wrapper);
    }

    match leaf {
        Value::Mapping(m) => Ok(m),
        // Unreachable: segments is non-empty, so at least one wrap happened.
        _ => Err(ConfigError::InvalidOverride(spec.to_owned())),
    }
}

/// Parse a list of override strings into fragments, preserving order.
pub fn parse_fragments(specs: &[String]) -> Result<Vec<Mapping>> {
    specs.iter().map(|s| parse_fragment(s)).collect()
}

fn scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::from("");
    }
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_key() {
        let fragment = Value::Mapping(parse_fragment("a=x").unwrap());
        assert_eq!(fragment["a"], Value::from("x"));
    }

    #[test]
    fn dotted_key_nests() {
        let fragment = Value::Mapping(parse_fragment("b.c=y").unwrap());
        assert_eq!(fragment["b"]["c"], Value::from("y"));
    }

    #[test]
    fn scalar_values_come_out_typed() {
        let fragment = Value::Mapping(parse_fragment("web.port=8080").unwrap());
        assert_eq!(fragment["web"]["port"], Value::from(8080));

        let fragment = Value::Mapping(parse_fragment("web.dev_mode=true").unwrap());
        assert_eq!(fragment["web"]["dev_mode"], Value::from(true));
    }

    #[test]
    fn empty_value_is_empty_string() {
        let fragment = Value::Mapping(parse_fragment("a.b=").unwrap());
        assert_eq!(fragment["a"]["b"], Value::from(""));
    }

    #[test]
    fn malformed_specs_fail() {
        for bad in ["novalue", "=x", "a..b=x", ".a=x"] {
            assert!(
                matches!(parse_fragment(bad), Err(ConfigError::InvalidOverride(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn list_parsing_preserves_order() {
        let specs = vec!["a=1".to_owned(), "a=2".to_owned()];
        let fragments = parse_fragments(&specs).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(Value::Mapping(fragments[1].clone())["a"], Value::from(2));
    }
}
