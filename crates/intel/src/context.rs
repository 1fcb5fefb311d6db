//! Inference context
//!
//! Rules never hold references to other entities. They ask the context for
//! entities of a type, and the context answers from the snapshot it was
//! built over.

use entitystore::{Entity, EntityStore, Visibility};

/// Read-only snapshot of the graph an inference pass runs against
#[derive(Debug, Clone)]
pub struct InferContext<'a> {
    entities: Vec<&'a Entity>,
}

impl<'a> InferContext<'a> {
    /// Create a context over a fixed set of entities
    pub fn new(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut entities: Vec<&'a Entity> = entities.into_iter().collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Self { entities }
    }

    /// Create a context over everything visible in `vis`
    pub fn from_store(store: &'a EntityStore, vis: Visibility) -> entitystore::Result<Self> {
        Ok(Self::new(store.entities(vis)?))
    }

    /// Every entity of `entity_type`, ordered by id
    pub fn all_entities_by_type<'s>(
        &'s self,
        entity_type: &'s str,
    ) -> impl Iterator<Item = &'a Entity> + 's {
        self.entities
            .iter()
            .copied()
            .filter(move |e| e.entity_type == entity_type)
    }

    /// The first entity of `entity_type`, if any
    pub fn find_one(&self, entity_type: &str) -> Option<&'a Entity> {
        self.all_entities_by_type(entity_type).next()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_type_is_ordered() {
        let b = Entity::new("b", "dockerImage", "api");
        let a = Entity::new("a", "dockerImage", "web");
        let ns = Entity::new("c", "k8sNamespace", "prod");
        let ctx = InferContext::new([&b, &ns, &a]);

        let ids: Vec<&str> = ctx
            .all_entities_by_type("dockerImage")
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(ctx.find_one("k8sNamespace").map(|e| e.name.as_str()), Some("prod"));
        assert!(ctx.find_one("k8sService").is_none());
    }

    #[test]
    fn test_from_store_respects_visibility() {
        let mut store = EntityStore::from_entities([Entity::new("a", "dockerImage", "web")]);
        let cs = store.create_change_set("cs", None);
        let es = store.create_edit_session(cs.pk).unwrap();
        let vis = Visibility::edit_session(cs.pk, es.pk);
        store
            .insert_entity(vis, Entity::new("b", "dockerImage", "api"))
            .unwrap();

        assert_eq!(InferContext::from_store(&store, Visibility::head()).unwrap().len(), 1);
        assert_eq!(InferContext::from_store(&store, vis).unwrap().len(), 2);
    }
}
