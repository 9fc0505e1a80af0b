use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use strata_shared::{Instant, ObjectMessage, ObjectPatch};

use crate::world::{
    delta::{ComponentUpdate, EntityDelta},
    entity::{EntityId, EntityTransform, ReplicatedEntity},
    error::EntityError,
};

/// Change received from a remote client, applied on the next tick
#[derive(Debug, Clone)]
pub(crate) enum IncomingChange {
    Create(ObjectMessage),
    Patch(ObjectPatch),
}

/// Arena of every entity known locally, with the parent/child links between
/// them and the replication bookkeeping for each.
///
/// An entity whose parent is not (yet) known counts as a root; it is adopted
/// as soon as the parent arrives.
#[derive(Default)]
pub(crate) struct EntityTable {
    entities: BTreeMap<EntityId, ReplicatedEntity>,
    deltas: HashMap<EntityId, EntityDelta>,
    queued: BTreeSet<EntityId>,
    incoming: VecDeque<IncomingChange>,
    last_patch: HashMap<EntityId, Instant>,
}

impl EntityTable {
    // Lookup

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.entities.contains_key(&entity_id)
    }

    pub fn get(&self, entity_id: EntityId) -> Option<&ReplicatedEntity> {
        self.entities.get(&entity_id)
    }

    pub fn try_get(&self, entity_id: EntityId) -> Result<&ReplicatedEntity, EntityError> {
        self.get(entity_id)
            .ok_or(EntityError::EntityNotFound { entity_id })
    }

    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities
            .values()
            .find(|entity| entity.name() == name)
            .map(ReplicatedEntity::id)
    }

    /// Parent, counting only parents that are known locally
    pub fn resolved_parent(&self, entity_id: EntityId) -> Option<EntityId> {
        self.get(entity_id)?
            .parent_id()
            .filter(|parent_id| self.contains(*parent_id))
    }

    pub fn roots(&self) -> Vec<EntityId> {
        self.entities
            .keys()
            .copied()
            .filter(|entity_id| self.resolved_parent(*entity_id).is_none())
            .collect()
    }

    pub fn children(&self, entity_id: EntityId) -> Vec<EntityId> {
        self.get(entity_id)
            .map(|entity| entity.children().to_vec())
            .unwrap_or_default()
    }

    /// Transform of the entity composed with every ancestor's, up to the root
    pub fn global_transform(&self, entity_id: EntityId) -> Option<EntityTransform> {
        let mut chain = vec![self.get(entity_id)?];
        let mut current = entity_id;
        while let Some(parent_id) = self.resolved_parent(current) {
            // Links are validated on every change, this only guards a corrupted table
            if chain.len() > self.entities.len() {
                break;
            }
            chain.push(self.get(parent_id)?);
            current = parent_id;
        }

        let mut global = EntityTransform::default();
        for entity in chain.iter().rev() {
            global = global.compose(entity.transform());
        }
        Some(global)
    }

    // Hierarchy

    pub fn insert(&mut self, mut entity: ReplicatedEntity) -> Result<(), EntityError> {
        let entity_id = entity.id();
        if self.contains(entity_id) {
            return Err(EntityError::EntityAlreadyExists { entity_id });
        }
        self.validate_new_parent(entity_id, entity.parent_id())?;

        for orphan in self.entities.values() {
            if orphan.parent_id() == Some(entity_id) {
                entity.add_child(orphan.id());
            }
        }
        if let Some(parent_id) = entity.parent_id() {
            if let Some(parent) = self.entities.get_mut(&parent_id) {
                parent.add_child(entity_id);
            }
        }

        self.entities.insert(entity_id, entity);
        Ok(())
    }

    /// Checks the parent an entity arrives with. The parent may still be
    /// unknown, but its known ancestors must not include an entity waiting to
    /// be adopted by the new one.
    pub fn validate_new_parent(
        &self,
        entity_id: EntityId,
        parent_id: Option<EntityId>,
    ) -> Result<(), EntityError> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        if self.contains(entity_id) {
            return Ok(());
        }

        let invalid = |reason| EntityError::InvalidParent {
            entity_id,
            parent_id,
            reason,
        };
        if parent_id == entity_id {
            return Err(invalid("an entity cannot be its own parent"));
        }

        let mut ancestor = self.get(parent_id);
        let mut steps = 0;
        while let Some(current) = ancestor {
            if current.parent_id() == Some(entity_id) {
                return Err(invalid("the parent is a descendant of the entity"));
            }
            steps += 1;
            if steps > self.entities.len() {
                break;
            }
            ancestor = current.parent_id().and_then(|id| self.get(id));
        }
        Ok(())
    }

    /// Checks that `parent_id` can become the parent of `entity_id`
    pub fn validate_parent(
        &self,
        entity_id: EntityId,
        parent_id: Option<EntityId>,
    ) -> Result<(), EntityError> {
        self.try_get(entity_id)?;
        let Some(parent_id) = parent_id else {
            return Ok(());
        };

        let invalid = |reason| EntityError::InvalidParent {
            entity_id,
            parent_id,
            reason,
        };
        if parent_id == entity_id {
            return Err(invalid("an entity cannot be its own parent"));
        }
        if !self.contains(parent_id) {
            return Err(invalid("the parent does not exist"));
        }

        let mut ancestor = Some(parent_id);
        let mut steps = 0;
        while let Some(ancestor_id) = ancestor {
            if ancestor_id == entity_id {
                return Err(invalid("the parent is a descendant of the entity"));
            }
            steps += 1;
            if steps > self.entities.len() {
                break;
            }
            ancestor = self.resolved_parent(ancestor_id);
        }
        Ok(())
    }

    pub fn set_parent(
        &mut self,
        entity_id: EntityId,
        parent_id: Option<EntityId>,
    ) -> Result<(), EntityError> {
        self.validate_parent(entity_id, parent_id)?;

        if let Some(old_parent_id) = self.resolved_parent(entity_id) {
            if let Some(old_parent) = self.entities.get_mut(&old_parent_id) {
                old_parent.remove_child(entity_id);
            }
        }
        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.entities.get_mut(&parent_id) {
                parent.add_child(entity_id);
            }
        }
        if let Some(entity) = self.entities.get_mut(&entity_id) {
            entity.set_parent_id(parent_id);
        }
        Ok(())
    }

    /// Removes an entity, re-rooting its direct children
    pub fn remove(&mut self, entity_id: EntityId) -> Option<ReplicatedEntity> {
        let parent_id = self.resolved_parent(entity_id);
        let mut entity = self.entities.remove(&entity_id)?;

        if let Some(parent) = parent_id.and_then(|parent_id| self.entities.get_mut(&parent_id)) {
            parent.remove_child(entity_id);
        }
        for child_id in entity.take_children() {
            if let Some(child) = self.entities.get_mut(&child_id) {
                child.set_parent_id(None);
            }
        }

        self.deltas.remove(&entity_id);
        self.queued.remove(&entity_id);
        self.last_patch.remove(&entity_id);
        Some(entity)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.deltas.clear();
        self.queued.clear();
        self.incoming.clear();
        self.last_patch.clear();
    }

    // Staged changes

    /// The entity together with its staged delta, created on demand
    pub fn entity_and_delta_mut(
        &mut self,
        entity_id: EntityId,
    ) -> Result<(&mut ReplicatedEntity, &mut EntityDelta), EntityError> {
        let entity = self
            .entities
            .get_mut(&entity_id)
            .ok_or(EntityError::EntityNotFound { entity_id })?;
        let delta = self.deltas.entry(entity_id).or_default();
        Ok((entity, delta))
    }

    pub fn has_pending_changes(&self, entity_id: EntityId) -> bool {
        self.deltas
            .get(&entity_id)
            .map_or(false, |delta| !delta.is_empty())
    }

    pub fn take_delta(&mut self, entity_id: EntityId) -> Option<EntityDelta> {
        self.deltas.remove(&entity_id)
    }

    /// Applies a staged delta to the entity it was built for
    pub fn apply_delta(&mut self, entity_id: EntityId, delta: &EntityDelta) -> Result<(), EntityError> {
        if let Some(parent_id) = delta.parent() {
            self.set_parent(entity_id, parent_id)?;
        }

        let entity = self
            .entities
            .get_mut(&entity_id)
            .ok_or(EntityError::EntityNotFound { entity_id })?;
        for (property, value) in delta.properties() {
            entity.apply_property(*property, value)?;
        }
        for (component_id, update) in delta.components() {
            match update {
                ComponentUpdate::Upsert(component) => entity.insert_component(component.clone()),
                ComponentUpdate::Delete => {
                    entity.remove_component(*component_id);
                }
            }
        }
        Ok(())
    }

    /// Applies a patch received from the relay. A patch that fails leaves
    /// the entity as it was.
    pub fn apply_patch(&mut self, patch: &ObjectPatch) -> Result<(), EntityError> {
        let entity_id = patch.id;
        self.try_get(entity_id)?;

        if patch.destroy {
            self.remove(entity_id);
            return Ok(());
        }
        if patch.should_update_parent {
            self.validate_parent(entity_id, patch.parent_id)?;
        }

        let entity = self
            .entities
            .get_mut(&entity_id)
            .ok_or(EntityError::EntityNotFound { entity_id })?;
        if let Some(components) = &patch.components {
            entity.apply_fields(components)?;
        }
        entity.set_owner_id(patch.owner_id);

        if patch.should_update_parent {
            self.set_parent(entity_id, patch.parent_id)?;
        }
        Ok(())
    }

    // Replication queues

    pub fn queue(&mut self, entity_id: EntityId) {
        self.queued.insert(entity_id);
    }

    pub fn is_queued(&self, entity_id: EntityId) -> bool {
        self.queued.contains(&entity_id)
    }

    pub fn queued(&self) -> Vec<EntityId> {
        self.queued.iter().copied().collect()
    }

    pub fn dequeue(&mut self, entity_id: EntityId) {
        self.queued.remove(&entity_id);
    }

    pub fn last_patch(&self, entity_id: EntityId) -> Option<Instant> {
        self.last_patch.get(&entity_id).copied()
    }

    pub fn record_patch(&mut self, entity_id: EntityId, sent_at: Instant) {
        self.last_patch.insert(entity_id, sent_at);
    }

    pub fn push_incoming(&mut self, change: IncomingChange) {
        self.incoming.push_back(change);
    }

    pub fn take_incoming(&mut self) -> VecDeque<IncomingChange> {
        std::mem::take(&mut self.incoming)
    }

    pub fn incoming_len(&self) -> usize {
        self.incoming.len()
    }
}
