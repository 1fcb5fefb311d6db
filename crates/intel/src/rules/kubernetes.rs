//! Kubernetes object rules

use super::{
    ArrayEntry, InferFn, parse_port_list, path, require_name, set_array_entries_from_all_entities,
    set_property, set_property_from_entity, set_property_from_property,
};
use crate::context::InferContext;
use crate::error::Result;
use entitystore::{Entity, PropertyValue, SystemName};
use std::collections::BTreeMap;

pub const DEPLOYMENT: &str = "k8sDeployment";
pub const NAMESPACE: &str = "k8sNamespace";
pub const SERVICE: &str = "k8sService";

/// Rules registered by [`crate::InferenceRegistry::builtin`]
pub fn rules() -> [(&'static str, InferFn); 3] {
    [
        (DEPLOYMENT, infer_deployment),
        (NAMESPACE, infer_namespace),
        (SERVICE, infer_service),
    ]
}

/// Namespace: `metadata.name` from the entity name
pub fn infer_namespace(entity: &mut Entity, _ctx: &InferContext<'_>) -> Result<()> {
    let name = require_name(entity)?.to_string();
    set_property(entity, &path("metadata.name")?, name);
    Ok(())
}

/// Deployment: name, app labels, namespace and one container per image
pub fn infer_deployment(entity: &mut Entity, ctx: &InferContext<'_>) -> Result<()> {
    let name = require_name(entity)?.to_string();
    let metadata_name = path("metadata.name")?;
    let app_label = path("metadata.labels.app")?;
    let namespace = path("metadata.namespace")?;

    set_property(entity, &metadata_name, name);
    set_property_from_property(entity, &metadata_name, &app_label);
    set_property_from_property(entity, &app_label, &path("spec.selector.matchLabels.app")?);
    set_property_from_property(
        entity,
        &app_label,
        &path("spec.template.metadata.labels.app")?,
    );

    set_property_from_entity(entity, ctx, NAMESPACE, &metadata_name, &namespace);
    set_property_from_property(entity, &namespace, &path("spec.template.metadata.namespace")?);

    let image = path("image")?;
    let exposed = path("ExposedPorts")?;
    let ports = path("ports")?;
    let container_name = path("name")?;
    set_array_entries_from_all_entities(
        entity,
        ctx,
        super::docker::IMAGE,
        &path("spec.template.spec.containers")?,
        |source| {
            let mut entries = vec![ArrayEntry::set(
                container_name.clone(),
                source.name.as_str(),
                SystemName::baseline(),
            )];
            for (system, value) in source.get_property_for_all_systems(&image) {
                entries.push(ArrayEntry::set(image.clone(), value, system));
            }
            for (system, value) in source.get_property_for_all_systems(&exposed) {
                for port in parse_port_list(source, &exposed, &value)? {
                    entries.push(ArrayEntry::append(ports.clone(), port.to_value(), system.clone()));
                }
            }
            Ok(entries)
        },
    )?;

    Ok(())
}

/// Service: name, namespace, selector and one port per exposed image port
pub fn infer_service(entity: &mut Entity, ctx: &InferContext<'_>) -> Result<()> {
    let name = require_name(entity)?.to_string();
    let metadata_name = path("metadata.name")?;

    set_property(entity, &metadata_name, name);
    set_property_from_entity(entity, ctx, NAMESPACE, &metadata_name, &path("metadata.namespace")?);
    set_property_from_entity(
        entity,
        ctx,
        DEPLOYMENT,
        &path("metadata.labels.app")?,
        &path("spec.selector.app")?,
    );

    let exposed = path("ExposedPorts")?;
    let images: Vec<&Entity> = ctx.all_entities_by_type(super::docker::IMAGE).collect();

    // Service ports are flat, not grouped per image
    let mut by_system: BTreeMap<SystemName, Vec<PropertyValue>> = BTreeMap::new();
    for source in images {
        for (system, value) in source.get_property_for_all_systems(&exposed) {
            for port in parse_port_list(source, &exposed, &value)? {
                let object = PropertyValue::Object(BTreeMap::from([
                    ("port".to_string(), PropertyValue::from(port.port)),
                    ("targetPort".to_string(), PropertyValue::from(port.port)),
                    ("protocol".to_string(), PropertyValue::from(port.protocol)),
                ]));
                by_system.entry(system.clone()).or_default().push(object);
            }
        }
    }

    let spec_ports = path("spec.ports")?;
    entity.properties.remove_subtree(&spec_ports);
    for (system, ports) in by_system {
        entity.set_property(spec_ports.clone(), PropertyValue::Array(ports), system);
    }
    Ok(())
}
