use std::collections::BTreeMap;

use strata_shared::{encode_property_value, ComponentField, ObjectPatch, ReplicatedValue};

use crate::world::{
    component::{Component, ComponentId},
    entity::{EntityId, EntityProperty, LockType},
    error::EntityError,
};

/// Staged change to one component
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentUpdate {
    Upsert(Component),
    Delete,
}

/// Changes made to an entity that have not been applied yet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDelta {
    properties: BTreeMap<EntityProperty, ReplicatedValue>,
    components: BTreeMap<ComponentId, ComponentUpdate>,
    parent: Option<Option<EntityId>>,
}

impl EntityDelta {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.components.is_empty() && self.parent.is_none()
    }

    pub fn set_property(&mut self, property: EntityProperty, value: ReplicatedValue) {
        self.properties.insert(property, value);
    }

    pub fn property(&self, property: EntityProperty) -> Option<&ReplicatedValue> {
        self.properties.get(&property)
    }

    /// Lock type staged by `lock` / `unlock`, if any
    pub fn staged_lock(&self) -> Option<LockType> {
        match self.property(EntityProperty::LockType)?.as_int()? {
            0 => Some(LockType::None),
            _ => Some(LockType::UserAgnostic),
        }
    }

    pub fn upsert_component(&mut self, component: Component) {
        self.components
            .insert(component.id(), ComponentUpdate::Upsert(component));
    }

    /// Stages a removal. A component that only exists in this delta is simply
    /// dropped from it.
    pub fn delete_component(&mut self, component_id: ComponentId, applied: bool) {
        if applied {
            self.components.insert(component_id, ComponentUpdate::Delete);
        } else {
            self.components.remove(&component_id);
        }
    }

    pub fn component(&self, component_id: ComponentId) -> Option<&ComponentUpdate> {
        self.components.get(&component_id)
    }

    pub fn staged_components(&self) -> impl Iterator<Item = &Component> {
        self.components.values().filter_map(|update| match update {
            ComponentUpdate::Upsert(component) => Some(component),
            ComponentUpdate::Delete => None,
        })
    }

    pub fn set_parent(&mut self, parent_id: Option<EntityId>) {
        self.parent = Some(parent_id);
    }

    /// `Some(new_parent)` when the parent changes
    pub fn parent(&self) -> Option<Option<EntityId>> {
        self.parent
    }

    pub fn properties(&self) -> &BTreeMap<EntityProperty, ReplicatedValue> {
        &self.properties
    }

    pub fn components(&self) -> &BTreeMap<ComponentId, ComponentUpdate> {
        &self.components
    }

    pub fn to_object_patch(
        &self,
        entity_id: EntityId,
        owner_id: u64,
    ) -> Result<ObjectPatch, EntityError> {
        let mut fields = BTreeMap::new();
        for (component_id, update) in &self.components {
            let field = match update {
                ComponentUpdate::Upsert(component) => component.to_field()?,
                ComponentUpdate::Delete => ComponentField::deleted(),
            };
            fields.insert(u64::from(*component_id), field);
        }
        for (property, value) in &self.properties {
            fields.insert(property.key(), encode_property_value(value)?);
        }

        Ok(ObjectPatch {
            id: entity_id,
            owner_id,
            destroy: false,
            should_update_parent: self.parent.is_some(),
            parent_id: self.parent.flatten(),
            components: if fields.is_empty() { None } else { Some(fields) },
        })
    }
}
