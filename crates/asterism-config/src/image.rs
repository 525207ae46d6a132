//! Container image references.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::Result;
use crate::value;

/// A reference to a container image, rendered as `repo/name:tag`, or
/// `name:tag` when no repository is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Optional repository (registry namespace).
    pub repository: Option<String>,
    /// Image name.
    pub name: String,
    /// Image tag.
    pub tag: String,
}

impl ImageReference {
    /// Build a reference from the mapping at `path`.
    ///
    /// `name_key` selects which key supplies the image name; several roles
    /// can then share one `repo`/`tag` entry with different names (the web
    /// image entry also names its migration image, for instance).
    pub fn from_doc(doc: &Value, path: &[&str], name_key: &str) -> Result<Self> {
        let repository = value::opt_string(doc, &subpath(path, "repo"))?;
        let name = value::string(doc, &subpath(path, name_key))?;
        let tag = value::string(doc, &subpath(path, "tag"))?;

        Ok(Self {
            repository,
            name,
            tag,
        })
    }
}

fn subpath<'a>(path: &[&'a str], last: &'a str) -> Vec<&'a str> {
    let mut out = path.to_vec();
    out.push(last);
    out
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repository {
            Some(repo) => write!(f, "{}/{}:{}", repo, self.name, self.tag),
            None => write!(f, "{}:{}", self.name, self.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_with_repository() {
        let image = ImageReference {
            repository: Some("a".to_owned()),
            name: "b".to_owned(),
            tag: "c".to_owned(),
        };
        assert_eq!(image.to_string(), "a/b:c");
    }

    #[test]
    fn wire_form_without_repository() {
        let image = ImageReference {
            repository: None,
            name: "e".to_owned(),
            tag: "f".to_owned(),
        };
        assert_eq!(image.to_string(), "e:f");
    }

    #[test]
    fn from_doc_with_alternate_name_key() {
        let doc: Value = serde_yaml::from_str(
            r#"
            foo:
              repo: a
              name: b
              tag: c
              other: d
              num: 1
            "#,
        )
        .unwrap();

        assert_eq!(
            ImageReference::from_doc(&doc, &["foo"], "name")
                .unwrap()
                .to_string(),
            "a/b:c"
        );
        assert_eq!(
            ImageReference::from_doc(&doc, &["foo"], "other")
                .unwrap()
                .to_string(),
            "a/d:c"
        );
        assert!(ImageReference::from_doc(&doc, &["foo"], "missing").is_err());
        assert!(ImageReference::from_doc(&doc, &["foo"], "num").is_err());
    }

    #[test]
    fn repo_is_optional_in_documents() {
        let doc: Value = serde_yaml::from_str("img: {name: redis, tag: '6'}").unwrap();
        let image = ImageReference::from_doc(&doc, &["img"], "name").unwrap();
        assert_eq!(image.to_string(), "redis:6");
    }
}
