//! Free-form user metadata attached to an identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key/value bag issued by the identity provider.
///
/// Deserialization never fails: anything that is not a JSON object (a
/// missing bag, `null`, a string...) becomes an empty bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder form of [`Metadata::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Shallow merge: top-level keys in `patch` replace existing ones.
    pub fn merge(&mut self, patch: &Metadata) {
        for (key, value) in &patch.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// True when every entry of `patch` is present here with an equal value.
    pub fn contains_all(&self, patch: &Metadata) -> bool {
        patch.0.iter().all(|(k, v)| self.0.get(k) == Some(v))
    }

    /// Read a string entry, ignoring entries of any other type.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Value> for Metadata {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Metadata(map),
            _ => Metadata::default(),
        }
    }
}

impl From<Metadata> for Value {
    fn from(metadata: Metadata) -> Self {
        Value::Object(metadata.0)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Metadata(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_values_become_empty() {
        for raw in [json!(null), json!("admin"), json!([1, 2]), json!(true)] {
            let metadata: Metadata = serde_json::from_value(raw).unwrap();
            assert!(metadata.is_empty());
        }
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut base = Metadata::new()
            .with("firstName", "Ada")
            .with("address", json!({"city": "Leeds", "zip": "LS1"}));
        let patch = Metadata::new()
            .with("lastName", "Lovelace")
            .with("address", json!({"city": "York"}));

        base.merge(&patch);

        assert_eq!(base.get_str("firstName"), Some("Ada"));
        assert_eq!(base.get_str("lastName"), Some("Lovelace"));
        assert_eq!(base.get("address"), Some(&json!({"city": "York"})));
        assert!(base.contains_all(&patch));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let metadata = Metadata::new().with("isAdmin", true);
        assert_eq!(serde_json::to_value(&metadata).unwrap(), json!({"isAdmin": true}));
    }
}
