//! Shared, serializable state tree.
//!
//! The tree is a JSON object. Entity collections live under dotted paths
//! (`"entities"`, `"registries.bullets"`), each mapping an entity key to a flat
//! record of properties. Storing everything as [`serde_json::Value`] keeps the
//! tree free of anything that cannot cross the wire.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat property bag stored per entity key.
pub type Record = Map<String, Value>;

/// Root of the shared state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateTree {
    root: Map<String, Value>,
}

/// Split a dotted path, rejecting empty paths and empty segments.
pub fn split_path(path: &str) -> Result<Vec<&str>, CoreError> {
    if path.is_empty() {
        return Err(CoreError::InvalidPath(path.to_string()));
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(CoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

impl StateTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON value; the value must be an object.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(CoreError::NotAnObject {
                path: String::new(),
                segment: String::new(),
            }),
        }
    }

    /// Top-level object.
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Whether the tree holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Resolve a dotted path to any value.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (last, parents) = path.rsplit_once('.').map_or((path, None), |(p, l)| (l, Some(p)));
        match parents {
            Some(parents) => self.collection(parents)?.get(last),
            None => self.root.get(last),
        }
    }

    /// Resolve a dotted path to an object, if every segment is an object.
    pub fn collection(&self, path: &str) -> Option<&Map<String, Value>> {
        let mut node = &self.root;
        for segment in path.split('.') {
            node = node.get(segment)?.as_object()?;
        }
        Some(node)
    }

    /// Resolve a dotted path to an object, creating missing segments.
    pub fn collection_mut(&mut self, path: &str) -> Result<&mut Map<String, Value>, CoreError> {
        let segments = split_path(path)?;
        let mut node = &mut self.root;
        for segment in segments {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(CoreError::NotAnObject {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    })
                }
            };
        }
        Ok(node)
    }

    /// Look up one entity record inside a collection.
    pub fn record(&self, path: &str, key: &str) -> Option<&Record> {
        self.collection(path)?.get(key)?.as_object()
    }

    /// Delete one entity record. Missing collections are not created.
    pub fn remove_record(&mut self, path: &str, key: &str) -> Option<Value> {
        let mut node = &mut self.root;
        for segment in path.split('.') {
            node = node.get_mut(segment)?.as_object_mut()?;
        }
        node.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_mut_creates_nested_path() {
        let mut tree = StateTree::new();
        tree.collection_mut("registries.bullets")
            .unwrap()
            .insert("b1".into(), json!({"x": 1.0}));

        assert_eq!(tree.record("registries.bullets", "b1").unwrap()["x"], 1.0);
        assert!(tree.collection("registries").is_some());
    }

    #[test]
    fn test_collection_mut_rejects_blocked_path() {
        let mut tree = StateTree::from_value(json!({"score": 3})).unwrap();

        let err = tree.collection_mut("score.players").unwrap_err();
        assert_eq!(
            err,
            CoreError::NotAnObject {
                path: "score.players".into(),
                segment: "score".into(),
            }
        );
    }

    #[test]
    fn test_split_path_rejects_empty_segments() {
        assert!(split_path("").is_err());
        assert!(split_path("a..b").is_err());
        assert!(split_path(".a").is_err());
        assert_eq!(split_path("a.b").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_record() {
        let mut tree = StateTree::from_value(json!({"entities": {"p1": {"x": 0}}})).unwrap();

        assert!(tree.remove_record("entities", "p1").is_some());
        assert!(tree.record("entities", "p1").is_none());
        assert!(tree.remove_record("missing", "p1").is_none());
        assert!(tree.collection("missing").is_none());
    }

    #[test]
    fn test_get_resolves_dotted_path() {
        let tree = StateTree::from_value(json!({"a": {"b": {"c": 7}}, "top": true})).unwrap();

        assert_eq!(tree.get("a.b.c"), Some(&json!(7)));
        assert_eq!(tree.get("top"), Some(&json!(true)));
        assert_eq!(tree.get("a.x.c"), None);
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(StateTree::from_value(json!([1, 2])).is_err());
    }
}
