//! Docker image rules

use super::{InferFn, parse_port_list, path, set_property};
use crate::context::InferContext;
use crate::error::{InferError, Result};
use entitystore::{Entity, SystemName};

pub const IMAGE: &str = "dockerImage";

pub fn rules() -> [(&'static str, InferFn); 1] {
    [(IMAGE, infer_image)]
}

/// Default `image` to the entity name and validate `ExposedPorts`
pub fn infer_image(entity: &mut Entity, _ctx: &InferContext<'_>) -> Result<()> {
    let image = path("image")?;
    if entity.get_property(&image, &SystemName::baseline()).is_none() {
        if entity.name.trim().is_empty() {
            return Err(InferError::MissingRequiredProperty {
                entity_id: entity.id.clone(),
                path: image,
            });
        }
        let name = entity.name.clone();
        set_property(entity, &image, name);
    }

    let exposed = path("ExposedPorts")?;
    for value in entity.get_property_for_all_systems(&exposed).values() {
        parse_port_list(entity, &exposed, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitystore::{PropertyPath, PropertyValue};

    fn p(s: &str) -> PropertyPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_image_defaults_to_name() {
        let mut entity = Entity::new("i", IMAGE, "nginx");
        infer_image(&mut entity, &InferContext::new([])).unwrap();
        assert_eq!(
            entity.get_property(&p("image"), &SystemName::baseline()),
            Some(&"nginx".into())
        );

        let mut pinned = Entity::new("i", IMAGE, "web").with_property(p("image"), "nginx:1.25");
        infer_image(&mut pinned, &InferContext::new([])).unwrap();
        assert_eq!(
            pinned.get_property(&p("image"), &SystemName::baseline()),
            Some(&"nginx:1.25".into())
        );
    }

    #[test]
    fn test_image_requires_name_or_image() {
        let mut entity = Entity::new("i", IMAGE, "");
        assert!(matches!(
            infer_image(&mut entity, &InferContext::new([])),
            Err(InferError::MissingRequiredProperty { .. })
        ));
    }

    #[test]
    fn test_invalid_exposed_port_is_reported() {
        let mut entity = Entity::new("i", IMAGE, "web")
            .with_property(p("ExposedPorts"), PropertyValue::Array(vec!["abc/tcp".into()]));
        assert!(matches!(
            infer_image(&mut entity, &InferContext::new([])),
            Err(InferError::InvalidValue { .. })
        ));
    }
}
