use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Kind of every rule the importer generates.
pub const GO_REPOSITORY: &str = "go_repository";

/// An attribute value of a generated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    List(Vec<String>),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// A build rule with attributes kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub kind: String,
    pub name: String,
    #[serde(serialize_with = "serialize_attrs")]
    attrs: Vec<(String, AttrValue)>,
}

fn serialize_attrs<S: Serializer>(
    attrs: &[(String, AttrValue)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(attrs.len()))?;
    for (key, value) in attrs {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

impl Rule {
    pub fn new(kind: &str, name: impl Into<String>) -> Self {
        Self { kind: kind.to_string(), name: name.into(), attrs: Vec::new() }
    }

    /// Set `key`, replacing an existing value in place.
    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((key.to_string(), value)),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        match self.attr(key)? {
            AttrValue::String(s) => Some(s),
            AttrValue::List(_) => None,
        }
    }

    pub fn attrs(&self) -> &[(String, AttrValue)] {
        &self.attrs
    }
}

/// Derive a Bazel repository name from a Go import path.
///
/// `github.com/pkg/errors` becomes `com_github_pkg_errors`: the host's
/// labels are reversed and every separator turns into an underscore.
pub fn import_path_to_repo_name(import_path: &str) -> String {
    let lower = import_path.to_lowercase();
    let mut components = lower.split('/');
    let host = components.next().unwrap_or_default();

    let mut parts: Vec<&str> = host.rsplit('.').collect();
    parts.extend(components);

    parts.join("_").replace(['.', '-'], "_")
}
