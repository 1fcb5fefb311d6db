//! Graph files: a list of entities in JSON or TOML

use anyhow::{Context, Result, bail};
use entitystore::Entity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Supported graph file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Toml,
}

impl GraphFormat {
    /// Detect the format from the file extension; anything else is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// The contents of a graph file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Graph {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read graph file: {}", path.display()))?;
        let graph = Self::parse(&content, GraphFormat::from_path(path))
            .with_context(|| format!("Invalid graph file: {}", path.display()))?;
        log::debug!("Loaded {} entities from {}", graph.entities.len(), path.display());
        Ok(graph)
    }

    pub fn parse(content: &str, format: GraphFormat) -> Result<Self> {
        let graph: Graph = match format {
            GraphFormat::Json => serde_json::from_str(content)?,
            GraphFormat::Toml => toml::from_str(content)?,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Entity ids must be unique
    fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for entity in &self.entities {
            if !seen.insert(&entity.id) {
                bail!("duplicate entity id: {}", entity.id);
            }
        }
        Ok(())
    }

    /// Find an entity by id, falling back to a unique name
    pub fn find(&self, key: &str) -> Result<&Entity> {
        if let Some(entity) = self.entities.iter().find(|e| e.id.as_str() == key) {
            return Ok(entity);
        }
        let mut named = self.entities.iter().filter(|e| e.name == key);
        match (named.next(), named.next()) {
            (Some(entity), None) => Ok(entity),
            (Some(_), Some(_)) => bail!("entity name {key:?} is ambiguous; use its id"),
            (None, _) => bail!("no entity with id or name {key:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitystore::{PropertyValue, SystemName};
    use tempfile::TempDir;

    const JSON_GRAPH: &str = r#"{
        "entities": [
            {"id": "ns", "type": "k8sNamespace", "name": "prod"},
            {"id": "img", "type": "dockerImage", "name": "web",
             "properties": {"ExposedPorts": {"baseline": ["8080/tcp"]}}}
        ]
    }"#;

    #[test]
    fn test_parse_json() {
        let graph = Graph::parse(JSON_GRAPH, GraphFormat::Json).unwrap();
        assert_eq!(graph.entities.len(), 2);

        let image = graph.find("web").unwrap();
        assert_eq!(image.entity_type, "dockerImage");
        assert_eq!(
            image
                .get_property(&"ExposedPorts".parse().unwrap(), &SystemName::baseline())
                .and_then(PropertyValue::as_array)
                .map(<[PropertyValue]>::len),
            Some(1)
        );
    }

    #[test]
    fn test_load_toml_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.toml");
        fs::write(
            &path,
            r#"
[[entities]]
id = "dep"
type = "k8sDeployment"
name = "web"

[entities.properties."spec.replicas"]
baseline = 2
aws = 3
"#,
        )
        .unwrap();

        let graph = Graph::load(&path).unwrap();
        let dep = graph.find("dep").unwrap();
        let replicas: entitystore::PropertyPath = "spec.replicas".parse().unwrap();
        assert_eq!(
            dep.get_property(&replicas, &SystemName::new("aws")),
            Some(&PropertyValue::from(3_i64))
        );
        assert_eq!(
            dep.get_property(&replicas, &SystemName::new("gcp")),
            Some(&PropertyValue::from(2_i64))
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let content = r#"{"entities": [
            {"id": "a", "type": "k8sNamespace", "name": "one"},
            {"id": "a", "type": "k8sNamespace", "name": "two"}
        ]}"#;
        assert!(Graph::parse(content, GraphFormat::Json).is_err());
    }

    #[test]
    fn test_find_by_name() {
        let content = r#"{"entities": [
            {"id": "a", "type": "k8sNamespace", "name": "shared"},
            {"id": "b", "type": "k8sService", "name": "shared"},
            {"id": "c", "type": "k8sService", "name": "api"}
        ]}"#;
        let graph = Graph::parse(content, GraphFormat::Json).unwrap();
        assert_eq!(graph.find("b").unwrap().name, "shared");
        assert_eq!(graph.find("api").unwrap().id.as_str(), "c");
        assert!(graph.find("shared").is_err());
        assert!(graph.find("missing").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Graph::load(Path::new("/nonexistent/graph.json")).is_err());
    }
}
