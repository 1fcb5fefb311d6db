//! Per-system property trees
//!
//! A [`PropertyTree`] maps each leaf path to the values it carries per system.
//! Lookups for a system that has no value of its own fall back to baseline.

use crate::error::{Error, Result};
use crate::types::{PropertyPath, PropertyValue, SystemName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Values of one leaf path, keyed by system
pub type SystemValues = BTreeMap<SystemName, PropertyValue>;

/// Leaf paths of an entity with their per-system values
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyTree {
    leaves: BTreeMap<PropertyPath, SystemValues>,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `system`, falling back to baseline
    pub fn get(&self, path: &PropertyPath, system: &SystemName) -> Option<&PropertyValue> {
        let values = self.leaves.get(path)?;
        values
            .get(system)
            .or_else(|| values.get(&SystemName::baseline()))
    }

    /// Value stored for exactly `system`, without fallback
    pub fn get_exact(&self, path: &PropertyPath, system: &SystemName) -> Option<&PropertyValue> {
        self.leaves.get(path)?.get(system)
    }

    /// Like [`get`](Self::get), but a missing value is an error
    pub fn resolve(&self, path: &PropertyPath, system: &SystemName) -> Result<&PropertyValue> {
        self.get(path, system)
            .ok_or_else(|| Error::UnresolvedProperty {
                path: path.clone(),
                system: system.clone(),
            })
    }

    /// Every system value stored at `path`
    pub fn get_for_all_systems(&self, path: &PropertyPath) -> SystemValues {
        self.leaves.get(path).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, path: PropertyPath, value: PropertyValue, system: SystemName) {
        self.leaves.entry(path).or_default().insert(system, value);
    }

    /// Remove the value stored for exactly `system`, dropping empty leaves
    pub fn remove(&mut self, path: &PropertyPath, system: &SystemName) -> Option<PropertyValue> {
        let values = self.leaves.get_mut(path)?;
        let removed = values.remove(system);
        if values.is_empty() {
            self.leaves.remove(path);
        }
        removed
    }

    /// Remove `prefix` and every path below it, returning how many leaves went away
    pub fn remove_subtree(&mut self, prefix: &PropertyPath) -> usize {
        let before = self.leaves.len();
        self.leaves.retain(|path, _| !path.starts_with(prefix));
        before - self.leaves.len()
    }

    pub fn contains(&self, path: &PropertyPath) -> bool {
        self.leaves.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &PropertyPath> {
        self.leaves.keys()
    }

    /// Iterate `(path, system, value)` in path-then-system order
    pub fn leaves(&self) -> impl Iterator<Item = (&PropertyPath, &SystemName, &PropertyValue)> {
        self.leaves
            .iter()
            .flat_map(|(path, values)| values.iter().map(move |(system, v)| (path, system, v)))
    }

    /// All systems that carry at least one value
    pub fn systems(&self) -> BTreeSet<SystemName> {
        self.leaves
            .values()
            .flat_map(|values| values.keys().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Render the resolved values for one system as a nested JSON object
    ///
    /// Numeric segments stay object keys; a shallower scalar is replaced when
    /// a deeper path needs to nest below it.
    pub fn render(&self, system: &SystemName) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        for path in self.leaves.keys() {
            let Some(value) = self.get(path, system) else {
                continue;
            };
            insert_at(&mut root, path.segments(), value.to_json());
        }
        serde_json::Value::Object(root)
    }
}

fn insert_at(
    node: &mut serde_json::Map<String, serde_json::Value>,
    segments: &[String],
    value: serde_json::Value,
) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        // A deeper path already nested below this one; keep both.
        if let serde_json::Value::Object(incoming) = &value
            && let Some(serde_json::Value::Object(existing)) = node.get_mut(head)
        {
            for (k, v) in incoming {
                existing.entry(k.clone()).or_insert_with(|| v.clone());
            }
            return;
        }
        node.insert(head.clone(), value);
        return;
    }
    let child = node
        .entry(head.clone())
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    if !child.is_object() {
        *child = serde_json::Value::Object(serde_json::Map::new());
    }
    if let serde_json::Value::Object(map) = child {
        insert_at(map, rest, value);
    }
}

impl FromIterator<(PropertyPath, SystemName, PropertyValue)> for PropertyTree {
    fn from_iter<T: IntoIterator<Item = (PropertyPath, SystemName, PropertyValue)>>(iter: T) -> Self {
        let mut tree = Self::new();
        for (path, system, value) in iter {
            tree.set(path, value, system);
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> PropertyPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_get_falls_back_to_baseline() {
        let mut tree = PropertyTree::new();
        tree.set(path("image"), "nginx".into(), SystemName::baseline());
        tree.set(path("image"), "nginx:prod".into(), "prod".into());

        assert_eq!(
            tree.get(&path("image"), &"prod".into()),
            Some(&PropertyValue::from("nginx:prod"))
        );
        assert_eq!(
            tree.get(&path("image"), &"staging".into()),
            Some(&PropertyValue::from("nginx"))
        );
        assert_eq!(tree.get_exact(&path("image"), &"staging".into()), None);
    }

    #[test]
    fn test_resolve_missing_is_error() {
        let mut tree = PropertyTree::new();
        tree.set(path("image"), "nginx".into(), "prod".into());

        let err = tree
            .resolve(&path("image"), &"staging".into())
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedProperty { .. }));
        assert!(tree.resolve(&path("missing"), &SystemName::baseline()).is_err());
    }

    #[test]
    fn test_get_for_all_systems() {
        let mut tree = PropertyTree::new();
        tree.set(path("image"), "a".into(), SystemName::baseline());
        tree.set(path("image"), "b".into(), "prod".into());

        let all = tree.get_for_all_systems(&path("image"));
        assert_eq!(all.len(), 2);
        assert!(tree.get_for_all_systems(&path("nope")).is_empty());
    }

    #[test]
    fn test_remove_drops_empty_leaf() {
        let mut tree = PropertyTree::new();
        tree.set(path("a"), "1".into(), SystemName::baseline());
        assert!(tree.remove(&path("a"), &SystemName::baseline()).is_some());
        assert!(!tree.contains(&path("a")));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_remove_subtree() {
        let mut tree = PropertyTree::new();
        tree.set(path("spec.containers.0.name"), "web".into(), SystemName::baseline());
        tree.set(path("spec.containers.1.name"), "db".into(), SystemName::baseline());
        tree.set(path("spec.replicas"), 2i64.into(), SystemName::baseline());

        assert_eq!(tree.remove_subtree(&path("spec.containers")), 2);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_render_nests_paths() {
        let mut tree = PropertyTree::new();
        tree.set(path("metadata.name"), "web".into(), SystemName::baseline());
        tree.set(path("metadata.namespace"), "prod".into(), "prod".into());
        tree.set(path("spec.replicas"), 3i64.into(), SystemName::baseline());

        assert_eq!(
            tree.render(&"prod".into()),
            json!({"metadata": {"name": "web", "namespace": "prod"}, "spec": {"replicas": 3}})
        );
        assert_eq!(
            tree.render(&SystemName::baseline()),
            json!({"metadata": {"name": "web"}, "spec": {"replicas": 3}})
        );
    }

    #[test]
    fn test_serde_uses_dotted_paths() {
        let mut tree = PropertyTree::new();
        tree.set(path("metadata.name"), "web".into(), SystemName::baseline());
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json, json!({"metadata.name": {"baseline": "web"}}));

        let back: PropertyTree = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
