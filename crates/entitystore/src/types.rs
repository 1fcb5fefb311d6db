//! Core value types: identifiers, property paths, systems and property values

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the default system every lookup falls back to
pub const BASELINE: &str = "baseline";

/// Stable identifier of an entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Primary key of a change set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSetPk(pub i64);

impl fmt::Display for ChangeSetPk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary key of an edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditSessionPk(pub i64);

impl fmt::Display for EditSessionPk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named deployment target whose values override baseline
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemName(String);

impl SystemName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The default system
    pub fn baseline() -> Self {
        Self(BASELINE.to_string())
    }

    pub fn is_baseline(&self) -> bool {
        self.0 == BASELINE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SystemName {
    fn default() -> Self {
        Self::baseline()
    }
}

impl fmt::Display for SystemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SystemName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Location of a leaf in a property tree
///
/// Segments are never empty and never contain `.`, so the dotted text form
/// round-trips. Paths order lexicographically by segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    /// Build a path from segments, validating each one
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::Validation("property path cannot be empty".into()));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Append a segment, returning the longer path
    pub fn child(&self, segment: impl Into<String>) -> Result<Self> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut segments = self.0.clone();
        segments.push(segment);
        Ok(Self(segments))
    }

    /// Concatenate another path onto this one
    pub fn join(&self, other: &PropertyPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Whether `prefix` is this path or one of its ancestors
    pub fn starts_with(&self, prefix: &PropertyPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::Validation("property path segment cannot be empty".into()));
    }
    if segment.contains('.') {
        return Err(Error::Validation(format!(
            "property path segment cannot contain '.': {segment}"
        )));
    }
    Ok(())
}

impl FromStr for PropertyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Validation("property path cannot be empty".into()));
        }
        Self::new(s.split('.'))
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PropertyPath> for String {
    fn from(path: PropertyPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// A property value: scalar, array or object
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, PropertyValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert into the equivalent JSON value
    pub fn to_json(&self) -> serde_json::Value {
        self.clone().into()
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<PropertyValue> for serde_json::Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => Self::Null,
            PropertyValue::Bool(b) => Self::Bool(b),
            PropertyValue::Number(n) => Self::Number(n),
            PropertyValue::String(s) => Self::String(s),
            PropertyValue::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            PropertyValue::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        Self::Number(value.into())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parse_and_display() {
        let path: PropertyPath = "spec.template.metadata.namespace".parse().unwrap();
        assert_eq!(path.segments().len(), 4);
        assert_eq!(path.to_string(), "spec.template.metadata.namespace");
    }

    #[test]
    fn test_path_rejects_empty_segments() {
        assert!("".parse::<PropertyPath>().is_err());
        assert!("metadata..name".parse::<PropertyPath>().is_err());
        assert!(PropertyPath::new(Vec::<String>::new()).is_err());
        assert!(PropertyPath::new(["a.b"]).is_err());
    }

    #[test]
    fn test_path_ordering_is_lexicographic_by_segment() {
        let a: PropertyPath = "metadata.name".parse().unwrap();
        let b: PropertyPath = "metadata.name.extra".parse().unwrap();
        let c: PropertyPath = "spec".parse().unwrap();
        let mut paths = vec![c.clone(), b.clone(), a.clone()];
        paths.sort();
        assert_eq!(paths, vec![a, b, c]);
    }

    #[test]
    fn test_path_starts_with() {
        let prefix: PropertyPath = "spec.template".parse().unwrap();
        let path: PropertyPath = "spec.template.spec.containers".parse().unwrap();
        assert!(path.starts_with(&prefix));
        assert!(!prefix.starts_with(&path));
    }

    #[test]
    fn test_value_json_conversion() {
        let json = serde_json::json!({"containerPort": 8080, "protocol": "UDP", "tags": [true, null]});
        let value = PropertyValue::from(json.clone());
        assert!(value.as_object().is_some());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_system_baseline() {
        assert!(SystemName::baseline().is_baseline());
        assert!(!SystemName::from("prod").is_baseline());
        assert_eq!(SystemName::default(), SystemName::baseline());
    }
}
