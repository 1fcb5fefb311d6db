//! Layered entity storage
//!
//! Head holds the applied entities. Each change set and each edit session
//! keeps an overlay of the entities it touched; reads walk edit session ->
//! change set -> head. An overlay entry remembers the parent's copy at the
//! time it was first touched, which is what merges compare against to
//! detect concurrent edits.

use crate::change_set::{
    ChangeSet, ChangeSetStatus, EditSession, EditSessionStatus, Visibility,
};
use crate::diff::{Diff, diff, leaf_changes};
use crate::entity::Entity;
use crate::error::{Conflict, Error, Result};
use crate::tree::PropertyTree;
use crate::types::{ChangeSetPk, EditSessionPk, EntityId, PropertyPath, SystemName};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct OverlayEntry {
    /// Parent's copy when first touched; `None` when created in this overlay
    base: Option<Entity>,
    current: Entity,
}

#[derive(Debug, Clone, Default)]
struct Overlay {
    entries: BTreeMap<EntityId, OverlayEntry>,
}

#[derive(Debug, Clone)]
struct ChangeSetSlot {
    change_set: ChangeSet,
    overlay: Overlay,
}

#[derive(Debug, Clone)]
struct EditSessionSlot {
    edit_session: EditSession,
    overlay: Overlay,
}

enum WriteTarget {
    Head,
    EditSession(EditSessionPk),
}

/// In-memory entity graph with change-set and edit-session overlays
#[derive(Debug, Clone)]
pub struct EntityStore {
    head: BTreeMap<EntityId, Entity>,
    change_sets: BTreeMap<ChangeSetPk, ChangeSetSlot>,
    edit_sessions: BTreeMap<EditSessionPk, EditSessionSlot>,
    next_pk: i64,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            head: BTreeMap::new(),
            change_sets: BTreeMap::new(),
            edit_sessions: BTreeMap::new(),
            next_pk: 1,
        }
    }

    /// Build a store whose head contains `entities`
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut store = Self::new();
        for entity in entities {
            store.head.insert(entity.id.clone(), entity);
        }
        store
    }

    fn allocate_pk(&mut self) -> i64 {
        let pk = self.next_pk;
        self.next_pk += 1;
        pk
    }

    // ========================================================================
    // Change sets and edit sessions
    // ========================================================================

    pub fn create_change_set(&mut self, name: &str, note: Option<&str>) -> ChangeSet {
        let change_set = ChangeSet {
            pk: ChangeSetPk(self.allocate_pk()),
            name: name.to_string(),
            note: note.map(ToString::to_string),
            status: ChangeSetStatus::Open,
        };
        log::debug!("Created change set {} ({})", change_set.pk, change_set.name);
        self.change_sets.insert(
            change_set.pk,
            ChangeSetSlot {
                change_set: change_set.clone(),
                overlay: Overlay::default(),
            },
        );
        change_set
    }

    pub fn create_edit_session(&mut self, change_set_pk: ChangeSetPk) -> Result<EditSession> {
        self.open_change_set(change_set_pk)?;
        let edit_session = EditSession {
            pk: EditSessionPk(self.allocate_pk()),
            change_set_pk,
            status: EditSessionStatus::Open,
        };
        log::debug!(
            "Created edit session {} in change set {}",
            edit_session.pk,
            change_set_pk
        );
        self.edit_sessions.insert(
            edit_session.pk,
            EditSessionSlot {
                edit_session: edit_session.clone(),
                overlay: Overlay::default(),
            },
        );
        Ok(edit_session)
    }

    pub fn change_set(&self, pk: ChangeSetPk) -> Result<&ChangeSet> {
        self.change_sets
            .get(&pk)
            .map(|slot| &slot.change_set)
            .ok_or(Error::ChangeSetNotFound(pk))
    }

    pub fn edit_session(&self, pk: EditSessionPk) -> Result<&EditSession> {
        self.edit_sessions
            .get(&pk)
            .map(|slot| &slot.edit_session)
            .ok_or(Error::EditSessionNotFound(pk))
    }

    pub fn list_open_change_sets(&self) -> Vec<&ChangeSet> {
        self.change_sets
            .values()
            .map(|slot| &slot.change_set)
            .filter(|cs| cs.is_open())
            .collect()
    }

    fn open_change_set(&self, pk: ChangeSetPk) -> Result<&ChangeSet> {
        let change_set = self.change_set(pk)?;
        if !change_set.is_open() {
            return Err(Error::ChangeSetNotOpen {
                pk,
                status: change_set.status,
            });
        }
        Ok(change_set)
    }

    fn open_edit_session(&self, pk: EditSessionPk) -> Result<&EditSession> {
        let edit_session = self.edit_session(pk)?;
        if !edit_session.is_open() {
            return Err(Error::EditSessionNotOpen {
                pk,
                status: edit_session.status,
            });
        }
        Ok(edit_session)
    }

    /// Save an edit session's writes into its change set
    ///
    /// Fails with [`Error::MergeConflict`] and merges nothing when the change
    /// set moved under any path/system the session also wrote.
    pub fn save_edit_session(&mut self, pk: EditSessionPk) -> Result<EditSession> {
        let change_set_pk = self.open_edit_session(pk)?.change_set_pk;
        self.open_change_set(change_set_pk)?;

        let target = Visibility::change_set(change_set_pk);
        let overlay = self.edit_sessions[&pk].overlay.clone();
        self.check_conflicts(&overlay, target)?;

        for (id, entry) in overlay.entries {
            let parent = self.lookup(&id, target).cloned();
            let merged = merge_entry(&entry, parent.as_ref());
            let Some(slot) = self.change_sets.get_mut(&change_set_pk) else {
                return Err(Error::ChangeSetNotFound(change_set_pk));
            };
            match slot.overlay.entries.get_mut(&id) {
                Some(existing) => existing.current = merged,
                None => {
                    // The session's base was read through an untouched change
                    // set, so it is head's copy from when editing started.
                    let base = entry.base.clone();
                    slot.overlay.entries.insert(id, OverlayEntry { base, current: merged });
                }
            }
        }

        let Some(slot) = self.edit_sessions.get_mut(&pk) else {
            return Err(Error::EditSessionNotFound(pk));
        };
        slot.edit_session.status = EditSessionStatus::Saved;
        slot.overlay = Overlay::default();
        log::info!("Saved edit session {pk} into change set {change_set_pk}");
        Ok(slot.edit_session.clone())
    }

    /// Discard an edit session's writes
    pub fn cancel_edit_session(&mut self, pk: EditSessionPk) -> Result<EditSession> {
        self.open_edit_session(pk)?;
        let Some(slot) = self.edit_sessions.get_mut(&pk) else {
            return Err(Error::EditSessionNotFound(pk));
        };
        slot.edit_session.status = EditSessionStatus::Canceled;
        slot.overlay = Overlay::default();
        log::info!("Canceled edit session {pk}");
        Ok(slot.edit_session.clone())
    }

    /// Merge a change set into head
    ///
    /// Open edit sessions must be saved or canceled first.
    pub fn apply_change_set(&mut self, pk: ChangeSetPk) -> Result<ChangeSet> {
        self.open_change_set(pk)?;
        let open_sessions: Vec<String> = self
            .edit_sessions
            .values()
            .filter(|slot| slot.edit_session.change_set_pk == pk && slot.edit_session.is_open())
            .map(|slot| slot.edit_session.pk.to_string())
            .collect();
        if !open_sessions.is_empty() {
            return Err(Error::Validation(format!(
                "change set {pk} has open edit sessions: {}",
                open_sessions.join(", ")
            )));
        }

        let overlay = self.change_sets[&pk].overlay.clone();
        self.check_conflicts(&overlay, Visibility::head())?;

        for (id, entry) in overlay.entries {
            let merged = merge_entry(&entry, self.head.get(&id));
            self.head.insert(id, merged);
        }

        let Some(slot) = self.change_sets.get_mut(&pk) else {
            return Err(Error::ChangeSetNotFound(pk));
        };
        slot.change_set.status = ChangeSetStatus::Applied;
        slot.overlay = Overlay::default();
        log::info!("Applied change set {pk} to head");
        Ok(slot.change_set.clone())
    }

    /// Abandon a change set, canceling any edit sessions still open in it
    pub fn abandon_change_set(&mut self, pk: ChangeSetPk) -> Result<ChangeSet> {
        self.open_change_set(pk)?;
        for slot in self.edit_sessions.values_mut() {
            if slot.edit_session.change_set_pk == pk && slot.edit_session.is_open() {
                slot.edit_session.status = EditSessionStatus::Canceled;
                slot.overlay = Overlay::default();
            }
        }
        let Some(slot) = self.change_sets.get_mut(&pk) else {
            return Err(Error::ChangeSetNotFound(pk));
        };
        slot.change_set.status = ChangeSetStatus::Abandoned;
        slot.overlay = Overlay::default();
        log::info!("Abandoned change set {pk}");
        Ok(slot.change_set.clone())
    }

    fn check_conflicts(&self, overlay: &Overlay, target: Visibility) -> Result<()> {
        let empty = PropertyTree::new();
        let mut conflicts = Vec::new();

        for (id, entry) in &overlay.entries {
            let Some(theirs) = self.lookup(id, target) else {
                continue;
            };
            let base = entry.base.as_ref().map_or(&empty, |b| &b.properties);
            for change in leaf_changes(base, &entry.current.properties) {
                let their_value = theirs.properties.get_exact(&change.path, &change.system);
                if their_value != change.old_value.as_ref()
                    && their_value != change.new_value.as_ref()
                {
                    conflicts.push(Conflict {
                        entity_id: id.clone(),
                        path: change.path,
                        system: change.system,
                    });
                }
            }
            for (field, ours) in intrinsic_fields(&entry.current) {
                let base = entry.base.as_ref().map(|b| intrinsic_field(b, field));
                if base == Some(ours) {
                    continue;
                }
                let their_value = intrinsic_field(theirs, field);
                if Some(their_value) != base && their_value != ours {
                    conflicts.push(Conflict {
                        entity_id: id.clone(),
                        path: PropertyPath::new([field])?,
                        system: SystemName::baseline(),
                    });
                }
            }
        }

        if conflicts.is_empty() {
            Ok(())
        } else {
            log::warn!("Merge into {target} found {} conflict(s)", conflicts.len());
            Err(Error::MergeConflict(conflicts))
        }
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    fn check_visibility(&self, vis: Visibility) -> Result<()> {
        match (vis.change_set_pk, vis.edit_session_pk) {
            (None, None) => Ok(()),
            (None, Some(es)) => Err(Error::Validation(format!(
                "edit session {es} given without its change set"
            ))),
            (Some(cs), None) => self.change_set(cs).map(|_| ()),
            (Some(cs), Some(es)) => {
                self.change_set(cs)?;
                let session = self.edit_session(es)?;
                if session.change_set_pk != cs {
                    return Err(Error::Validation(format!(
                        "edit session {es} belongs to change set {}, not {cs}",
                        session.change_set_pk
                    )));
                }
                Ok(())
            }
        }
    }

    fn write_target(&self, vis: Visibility) -> Result<WriteTarget> {
        self.check_visibility(vis)?;
        match (vis.change_set_pk, vis.edit_session_pk) {
            (None, _) => Ok(WriteTarget::Head),
            (Some(cs), None) => Err(Error::Validation(format!(
                "writes inside change set {cs} require an edit session"
            ))),
            (Some(cs), Some(es)) => {
                self.open_change_set(cs)?;
                self.open_edit_session(es)?;
                Ok(WriteTarget::EditSession(es))
            }
        }
    }

    /// The scope an edit in `vis` is compared against
    pub fn parent_visibility(vis: Visibility) -> Option<Visibility> {
        match (vis.change_set_pk, vis.edit_session_pk) {
            (Some(cs), Some(_)) => Some(Visibility::change_set(cs)),
            (Some(_), None) => Some(Visibility::head()),
            (None, _) => None,
        }
    }

    fn lookup(&self, id: &EntityId, vis: Visibility) -> Option<&Entity> {
        if let Some(es) = vis.edit_session_pk
            && let Some(entry) = self
                .edit_sessions
                .get(&es)
                .and_then(|slot| slot.overlay.entries.get(id))
        {
            return Some(&entry.current);
        }
        if let Some(cs) = vis.change_set_pk
            && let Some(entry) = self
                .change_sets
                .get(&cs)
                .and_then(|slot| slot.overlay.entries.get(id))
        {
            return Some(&entry.current);
        }
        self.head.get(id)
    }

    // ========================================================================
    // Entity API
    // ========================================================================

    pub fn get_entity(&self, id: &EntityId, vis: Visibility) -> Result<&Entity> {
        self.check_visibility(vis)?;
        self.lookup(id, vis)
            .ok_or_else(|| Error::EntityNotFound(id.clone()))
    }

    /// Every entity visible in `vis`, ordered by id
    pub fn entities(&self, vis: Visibility) -> Result<Vec<&Entity>> {
        self.check_visibility(vis)?;
        let mut view: BTreeMap<&EntityId, &Entity> = self.head.iter().collect();
        if let Some(cs) = vis.change_set_pk
            && let Some(slot) = self.change_sets.get(&cs)
        {
            view.extend(slot.overlay.entries.iter().map(|(id, e)| (id, &e.current)));
        }
        if let Some(es) = vis.edit_session_pk
            && let Some(slot) = self.edit_sessions.get(&es)
        {
            view.extend(slot.overlay.entries.iter().map(|(id, e)| (id, &e.current)));
        }
        Ok(view.into_values().collect())
    }

    pub fn all_entities_by_type(&self, entity_type: &str, vis: Visibility) -> Result<Vec<&Entity>> {
        Ok(self
            .entities(vis)?
            .into_iter()
            .filter(|e| e.entity_type == entity_type)
            .collect())
    }

    pub fn insert_entity(&mut self, vis: Visibility, entity: Entity) -> Result<()> {
        let target = self.write_target(vis)?;
        if self.lookup(&entity.id, vis).is_some() {
            return Err(Error::DuplicateEntity(entity.id));
        }
        log::debug!("Inserting entity {} in {vis}", entity.id);
        match target {
            WriteTarget::Head => {
                self.head.insert(entity.id.clone(), entity);
            }
            WriteTarget::EditSession(es) => {
                if let Some(slot) = self.edit_sessions.get_mut(&es) {
                    slot.overlay.entries.insert(
                        entity.id.clone(),
                        OverlayEntry {
                            base: None,
                            current: entity,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    pub fn update_entity(&mut self, vis: Visibility, entity: Entity) -> Result<()> {
        let target = self.write_target(vis)?;
        match target {
            WriteTarget::Head => {
                let Some(slot) = self.head.get_mut(&entity.id) else {
                    return Err(Error::EntityNotFound(entity.id));
                };
                *slot = entity;
            }
            WriteTarget::EditSession(es) => {
                let parent = Self::parent_visibility(vis).unwrap_or_default();
                let base = self.lookup(&entity.id, parent).cloned();
                let Some(slot) = self.edit_sessions.get_mut(&es) else {
                    return Err(Error::EditSessionNotFound(es));
                };
                match slot.overlay.entries.get_mut(&entity.id) {
                    Some(existing) => existing.current = entity,
                    None => {
                        if base.is_none() {
                            return Err(Error::EntityNotFound(entity.id));
                        }
                        slot.overlay
                            .entries
                            .insert(entity.id.clone(), OverlayEntry { base, current: entity });
                    }
                }
            }
        }
        Ok(())
    }

    /// Delta between an entity in the parent scope and in `vis`
    pub fn diff_entity(&self, id: &EntityId, vis: Visibility) -> Result<Diff> {
        self.check_visibility(vis)?;
        let Some(parent) = Self::parent_visibility(vis) else {
            return Err(Error::Validation(
                "head has no parent scope to diff against".into(),
            ));
        };
        let current = self.lookup(id, vis);
        let baseline = self.lookup(id, parent);
        if current.is_none() && baseline.is_none() {
            return Err(Error::EntityNotFound(id.clone()));
        }
        let empty = PropertyTree::new();
        Ok(diff(
            baseline.map_or(&empty, |e| &e.properties),
            current.map_or(&empty, |e| &e.properties),
        ))
    }
}

/// Replay an overlay entry's own writes onto the target's current copy
fn merge_entry(entry: &OverlayEntry, target: Option<&Entity>) -> Entity {
    let Some(target) = target else {
        return entry.current.clone();
    };
    let empty = PropertyTree::new();
    let base = entry.base.as_ref().map_or(&empty, |b| &b.properties);

    let mut merged = target.clone();
    for change in leaf_changes(base, &entry.current.properties) {
        match change.new_value {
            Some(value) => merged.properties.set(change.path, value, change.system),
            None => {
                merged.properties.remove(&change.path, &change.system);
            }
        }
    }
    if entry.base.as_ref().is_none_or(|b| b.name != entry.current.name) {
        merged.name = entry.current.name.clone();
    }
    if entry
        .base
        .as_ref()
        .is_none_or(|b| b.entity_type != entry.current.entity_type)
    {
        merged.entity_type = entry.current.entity_type.clone();
    }
    merged
}

const INTRINSIC_FIELDS: [&str; 2] = ["name", "type"];

/// Entity fields outside the property tree, keyed as serialized
fn intrinsic_fields(entity: &Entity) -> impl Iterator<Item = (&'static str, &str)> {
    INTRINSIC_FIELDS
        .into_iter()
        .map(move |field| (field, intrinsic_field(entity, field)))
}

fn intrinsic_field<'a>(entity: &'a Entity, field: &str) -> &'a str {
    match field {
        "type" => &entity.entity_type,
        _ => &entity.name,
    }
}
