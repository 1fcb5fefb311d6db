//! Rule helpers and the built-in rule sets
//!
//! A rule is a plain function over one entity and a read-only context. The
//! helpers here are the only way rules write properties, so every rule gets
//! the same skip-on-missing and per-system semantics.

pub mod docker;
pub mod kubernetes;

use crate::context::InferContext;
use crate::error::{InferError, Result};
use entitystore::{Entity, PropertyPath, PropertyValue, SystemName};
use std::collections::BTreeMap;

/// A rule's inference function
pub type InferFn = fn(&mut Entity, &InferContext<'_>) -> Result<()>;

/// Parse a dotted path literal used inside a rule
pub fn path(dotted: &str) -> Result<PropertyPath> {
    Ok(dotted.parse()?)
}

// ============================================================================
// Scalar writes
// ============================================================================

/// Set an intrinsic baseline value
pub fn set_property(entity: &mut Entity, to: &PropertyPath, value: impl Into<PropertyValue>) {
    entity.set_property(to.clone(), value.into(), SystemName::baseline());
}

/// Copy every per-system value at `from` to `to` on the same entity
///
/// Returns `false` and writes nothing if `from` is absent.
pub fn set_property_from_property(entity: &mut Entity, from: &PropertyPath, to: &PropertyPath) -> bool {
    let values = entity.get_property_for_all_systems(from);
    if values.is_empty() {
        return false;
    }
    for (system, value) in values {
        entity.set_property(to.clone(), value, system);
    }
    true
}

/// Copy `from` on the first related entity of `entity_type` to `to`
///
/// A missing related entity or a missing source path is not an error; the
/// destination is left untouched.
pub fn set_property_from_entity(
    entity: &mut Entity,
    ctx: &InferContext<'_>,
    entity_type: &str,
    from: &PropertyPath,
    to: &PropertyPath,
) -> bool {
    let Some(source) = ctx.find_one(entity_type) else {
        return false;
    };
    let values = source.get_property_for_all_systems(from);
    if values.is_empty() {
        return false;
    }
    for (system, value) in values {
        entity.set_property(to.clone(), value, system);
    }
    true
}

// ============================================================================
// Array expansion
// ============================================================================

/// One write produced for one array element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayEntry {
    /// Path relative to the element (`image`, `ports`, ...)
    pub path: PropertyPath,
    pub value: PropertyValue,
    pub system: SystemName,
    /// Collect repeated writes into a list instead of overwriting
    pub append: bool,
}

impl ArrayEntry {
    pub fn set(path: PropertyPath, value: impl Into<PropertyValue>, system: SystemName) -> Self {
        Self {
            path,
            value: value.into(),
            system,
            append: false,
        }
    }

    pub fn append(path: PropertyPath, value: impl Into<PropertyValue>, system: SystemName) -> Self {
        Self {
            path,
            value: value.into(),
            system,
            append: true,
        }
    }
}

/// Build `to.<i>.*` from every related entity of `entity_type`
///
/// Element `i` comes from the i-th related entity in id order. The whole
/// subtree under `to` is replaced, so reruns never leave stale elements.
/// Returns the number of elements written.
pub fn set_array_entries_from_all_entities<F>(
    entity: &mut Entity,
    ctx: &InferContext<'_>,
    entity_type: &str,
    to: &PropertyPath,
    mut entries_for: F,
) -> Result<usize>
where
    F: FnMut(&Entity) -> Result<Vec<ArrayEntry>>,
{
    let mut writes: Vec<(PropertyPath, SystemName, PropertyValue)> = Vec::new();
    let mut count = 0;

    for (index, source) in ctx.all_entities_by_type(entity_type).enumerate() {
        let element = to.child(index.to_string())?;
        let mut appended: BTreeMap<(PropertyPath, SystemName), Vec<PropertyValue>> = BTreeMap::new();

        for entry in entries_for(source)? {
            let target = element.join(&entry.path);
            if entry.append {
                appended
                    .entry((target, entry.system))
                    .or_default()
                    .push(entry.value);
            } else {
                writes.push((target, entry.system, entry.value));
            }
        }
        writes.extend(
            appended
                .into_iter()
                .map(|((target, system), values)| (target, system, PropertyValue::Array(values))),
        );
        count += 1;
    }

    entity.properties.remove_subtree(to);
    for (target, system, value) in writes {
        entity.set_property(target, value, system);
    }
    Ok(count)
}

// ============================================================================
// Value parsing
// ============================================================================

/// Protocol used when an exposed port names none
pub const DEFAULT_PROTOCOL: &str = "TCP";

/// A container port parsed from `"8080"` or `"8080/udp"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPort {
    pub port: u16,
    pub protocol: String,
}

impl ContainerPort {
    /// Kubernetes container port object: `{containerPort, protocol}`
    pub fn to_value(&self) -> PropertyValue {
        PropertyValue::Object(BTreeMap::from([
            ("containerPort".to_string(), PropertyValue::from(self.port)),
            ("protocol".to_string(), PropertyValue::from(self.protocol.as_str())),
        ]))
    }
}

/// Parse an exposed-port string
///
/// Accepts `port` or `port/protocol`. The protocol is uppercased and
/// defaults to `TCP`.
pub fn parse_port(raw: &str) -> std::result::Result<ContainerPort, String> {
    let raw = raw.trim();
    let mut parts = raw.split('/');
    let port = parts.next().unwrap_or_default();
    let protocol = parts.next().unwrap_or_default().trim();
    if parts.next().is_some() {
        return Err(format!("unexpected segment after protocol in {raw:?}"));
    }

    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| format!("invalid port number in {raw:?}"))?;
    let protocol = if protocol.is_empty() {
        DEFAULT_PROTOCOL.to_string()
    } else {
        protocol.to_uppercase()
    };

    Ok(ContainerPort { port, protocol })
}

/// Parse every string in a port list at `path`, for one system
pub fn parse_port_list(
    entity: &Entity,
    path: &PropertyPath,
    value: &PropertyValue,
) -> Result<Vec<ContainerPort>> {
    let invalid = |message: String| InferError::InvalidValue {
        entity_id: entity.id.clone(),
        path: path.clone(),
        message,
    };

    let items = value
        .as_array()
        .ok_or_else(|| invalid("expected a list of ports".to_string()))?;
    items
        .iter()
        .map(|item| {
            let raw = item
                .as_str()
                .ok_or_else(|| invalid(format!("expected a port string, got {item}")))?;
            parse_port(raw).map_err(invalid)
        })
        .collect()
}

/// The entity's display name, or an error naming `path` when empty
pub fn require_name(entity: &Entity) -> Result<&str> {
    if entity.name.trim().is_empty() {
        return Err(InferError::MissingRequiredProperty {
            entity_id: entity.id.clone(),
            path: path("name")?,
        });
    }
    Ok(&entity.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PropertyPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(
            parse_port("8080/udp").unwrap(),
            ContainerPort {
                port: 8080,
                protocol: "UDP".into()
            }
        );
        assert_eq!(parse_port("443").unwrap().protocol, "TCP");
        assert_eq!(parse_port(" 53/Udp ").unwrap().port, 53);
        assert!(parse_port("http/tcp").is_err());
        assert!(parse_port("70000").is_err());
        assert!(parse_port("8080/udp/x").is_err());
    }

    #[test]
    fn test_extra_port_segment_is_invalid_value() {
        let entity = Entity::new("img", "dockerImage", "web");
        let value = PropertyValue::Array(vec!["80/tcp".into(), "8080/udp/x".into()]);
        let err = parse_port_list(&entity, &p("ExposedPorts"), &value).unwrap_err();
        assert!(matches!(err, InferError::InvalidValue { .. }));
    }

    #[test]
    fn test_container_port_value_is_numeric() {
        let value = parse_port("8080/udp").unwrap().to_value().to_json();
        assert_eq!(value, serde_json::json!({"containerPort": 8080, "protocol": "UDP"}));
    }

    #[test]
    fn test_set_property_from_property_copies_all_systems() {
        let mut entity = Entity::new("d", "k8sDeployment", "web").with_property(p("a"), "base");
        entity.set_property(p("a"), "prod-value".into(), "prod".into());

        assert!(set_property_from_property(&mut entity, &p("a"), &p("b")));
        assert_eq!(
            entity.get_property(&p("b"), &"prod".into()),
            Some(&"prod-value".into())
        );
        assert!(!set_property_from_property(&mut entity, &p("missing"), &p("c")));
        assert!(entity.get_property(&p("c"), &SystemName::baseline()).is_none());
    }

    #[test]
    fn test_set_property_from_entity_skips_missing_source() {
        let mut entity = Entity::new("d", "k8sDeployment", "web");
        let ctx = InferContext::new([]);
        assert!(!set_property_from_entity(
            &mut entity,
            &ctx,
            "k8sNamespace",
            &p("metadata.name"),
            &p("metadata.namespace"),
        ));
        assert!(entity.properties.is_empty());
    }

    #[test]
    fn test_array_expansion_replaces_previous_elements() {
        let a = Entity::new("a", "dockerImage", "web");
        let b = Entity::new("b", "dockerImage", "api");
        let mut target = Entity::new("d", "k8sDeployment", "web")
            .with_property(p("items.5.name"), "stale");

        let ctx = InferContext::new([&b, &a]);
        let written = set_array_entries_from_all_entities(&mut target, &ctx, "dockerImage", &p("items"), |e| {
            Ok(vec![
                ArrayEntry::set(p("name"), e.name.as_str(), SystemName::baseline()),
                ArrayEntry::append(p("tags"), "x", SystemName::baseline()),
                ArrayEntry::append(p("tags"), "y", SystemName::baseline()),
            ])
        })
        .unwrap();

        assert_eq!(written, 2);
        let base = SystemName::baseline();
        assert_eq!(target.get_property(&p("items.0.name"), &base), Some(&"web".into()));
        assert_eq!(target.get_property(&p("items.1.name"), &base), Some(&"api".into()));
        assert!(target.get_property(&p("items.5.name"), &base).is_none());
        assert_eq!(
            target.get_property(&p("items.0.tags"), &base),
            Some(&PropertyValue::Array(vec!["x".into(), "y".into()]))
        );
    }

    #[test]
    fn test_require_name() {
        let entity = Entity::new("d", "k8sDeployment", " ");
        assert!(matches!(
            require_name(&entity),
            Err(InferError::MissingRequiredProperty { .. })
        ));
    }
}
