use std::collections::BTreeMap;

use strata_shared::{
    decode_component_value, encode_property_value, ComponentField, ObjectMessage,
    ReplicatedValue, Vector3, Vector4, COMPONENT_KEY_END_COMPONENTS,
};

use crate::world::{
    component::{Component, ComponentId},
    error::EntityError,
};

/// Id of a replicated entity, assigned by the relay (or locally when offline)
pub type EntityId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Avatar,
    Object,
}

impl EntityType {
    pub fn wire_id(self) -> u64 {
        match self {
            EntityType::Avatar => 1,
            EntityType::Object => 2,
        }
    }

    pub fn from_wire_id(type_id: u64) -> Result<Self, EntityError> {
        match type_id {
            1 => Ok(EntityType::Avatar),
            2 => Ok(EntityType::Object),
            _ => Err(EntityError::UnknownEntityType { type_id }),
        }
    }
}

/// Lock placed on an entity. A locked entity cannot gain or lose components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockType {
    #[default]
    None,
    /// Nobody may mutate the entity, anybody may remove the lock
    UserAgnostic,
}

impl LockType {
    pub(crate) fn wire_id(self) -> i64 {
        match self {
            LockType::None => 0,
            LockType::UserAgnostic => 1,
        }
    }

    fn from_wire_id(value: i64) -> Option<Self> {
        match value {
            0 => Some(LockType::None),
            1 => Some(LockType::UserAgnostic),
            _ => None,
        }
    }
}

/// Local transform of an entity, relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityTransform {
    pub position: Vector3,
    pub rotation: Vector4,
    pub scale: Vector3,
}

impl Default for EntityTransform {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Vector4::IDENTITY,
            scale: Vector3::ONE,
        }
    }
}

impl EntityTransform {
    pub fn new(position: Vector3, rotation: Vector4, scale: Vector3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Expresses `local` (relative to `self`) in the frame `self` is relative to
    pub fn compose(&self, local: &EntityTransform) -> EntityTransform {
        EntityTransform {
            position: self.position + self.rotation.rotate(self.scale.scale_by(local.position)),
            rotation: self.rotation.quat_mul(local.rotation),
            scale: self.scale.scale_by(local.scale),
        }
    }
}

/// Entity-level fields replicated alongside components, stored at the view
/// keys `COMPONENT_KEY_END_COMPONENTS + n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityProperty {
    Name,
    Position,
    Rotation,
    Scale,
    ThirdPartyRef,
    LockType,
}

impl EntityProperty {
    pub const ALL: [EntityProperty; 6] = [
        EntityProperty::Name,
        EntityProperty::Position,
        EntityProperty::Rotation,
        EntityProperty::Scale,
        EntityProperty::ThirdPartyRef,
        EntityProperty::LockType,
    ];

    pub fn key(self) -> u64 {
        let offset = match self {
            EntityProperty::Name => 0,
            EntityProperty::Position => 1,
            EntityProperty::Rotation => 2,
            EntityProperty::Scale => 3,
            EntityProperty::ThirdPartyRef => 4,
            EntityProperty::LockType => 5,
        };
        COMPONENT_KEY_END_COMPONENTS + offset
    }

    pub fn from_key(key: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|property| property.key() == key)
    }
}

/// A node of the replicated scene graph
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicatedEntity {
    id: EntityId,
    entity_type: EntityType,
    name: String,
    transform: EntityTransform,
    third_party_ref: String,
    owner_id: u64,
    is_transferable: bool,
    is_persistent: bool,
    parent_id: Option<EntityId>,
    children: Vec<EntityId>,
    components: BTreeMap<ComponentId, Component>,
    lock_type: LockType,
    next_component_id: ComponentId,
}

impl ReplicatedEntity {
    pub(crate) fn new(
        id: EntityId,
        entity_type: EntityType,
        name: &str,
        transform: EntityTransform,
        owner_id: u64,
        parent_id: Option<EntityId>,
    ) -> Self {
        Self {
            id,
            entity_type,
            name: name.to_string(),
            transform,
            third_party_ref: String::new(),
            owner_id,
            is_transferable: true,
            is_persistent: true,
            parent_id,
            children: Vec::new(),
            components: BTreeMap::new(),
            lock_type: LockType::None,
            next_component_id: 0,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> &EntityTransform {
        &self.transform
    }

    pub fn position(&self) -> Vector3 {
        self.transform.position
    }

    pub fn rotation(&self) -> Vector4 {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vector3 {
        self.transform.scale
    }

    pub fn third_party_ref(&self) -> &str {
        &self.third_party_ref
    }

    pub fn owner_id(&self) -> u64 {
        self.owner_id
    }

    pub fn is_transferable(&self) -> bool {
        self.is_transferable
    }

    pub fn is_persistent(&self) -> bool {
        self.is_persistent
    }

    pub fn parent_id(&self) -> Option<EntityId> {
        self.parent_id
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn component(&self, component_id: ComponentId) -> Option<&Component> {
        self.components.get(&component_id)
    }

    pub fn components(&self) -> &BTreeMap<ComponentId, Component> {
        &self.components
    }

    pub fn lock_type(&self) -> LockType {
        self.lock_type
    }

    pub fn is_locked(&self) -> bool {
        self.lock_type != LockType::None
    }

    // Mutation, crate-internal so every change goes through the engine

    pub(crate) fn set_owner_id(&mut self, owner_id: u64) {
        self.owner_id = owner_id;
    }

    pub(crate) fn set_parent_id(&mut self, parent_id: Option<EntityId>) {
        self.parent_id = parent_id;
    }

    pub(crate) fn add_child(&mut self, child_id: EntityId) {
        if !self.children.contains(&child_id) {
            self.children.push(child_id);
        }
    }

    pub(crate) fn remove_child(&mut self, child_id: EntityId) {
        self.children.retain(|id| *id != child_id);
    }

    pub(crate) fn take_children(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.children)
    }

    /// Next unused component id. Ids stop short of the view property keys.
    pub(crate) fn allocate_component_id(&mut self) -> Result<ComponentId, EntityError> {
        let component_id = self.next_component_id;
        if u64::from(component_id) >= COMPONENT_KEY_END_COMPONENTS {
            return Err(EntityError::ComponentIdsExhausted { entity_id: self.id });
        }
        self.next_component_id += 1;
        Ok(component_id)
    }

    pub(crate) fn insert_component(&mut self, component: Component) {
        if component.id() >= self.next_component_id {
            self.next_component_id = component.id().saturating_add(1);
        }
        self.components.insert(component.id(), component);
    }

    pub(crate) fn remove_component(&mut self, component_id: ComponentId) -> Option<Component> {
        self.components.remove(&component_id)
    }

    /// Current value of a view property
    pub fn property(&self, property: EntityProperty) -> ReplicatedValue {
        match property {
            EntityProperty::Name => self.name.clone().into(),
            EntityProperty::Position => self.transform.position.into(),
            EntityProperty::Rotation => self.transform.rotation.into(),
            EntityProperty::Scale => self.transform.scale.into(),
            EntityProperty::ThirdPartyRef => self.third_party_ref.clone().into(),
            EntityProperty::LockType => self.lock_type.wire_id().into(),
        }
    }

    pub(crate) fn apply_property(
        &mut self,
        property: EntityProperty,
        value: &ReplicatedValue,
    ) -> Result<(), EntityError> {
        let mismatch = || EntityError::PropertyType {
            property,
            found: value.value_type(),
        };

        match property {
            EntityProperty::Name => self.name = value.as_str().ok_or_else(mismatch)?.to_string(),
            EntityProperty::Position => {
                self.transform.position = value.as_vector3().ok_or_else(mismatch)?
            }
            EntityProperty::Rotation => {
                self.transform.rotation = value.as_vector4().ok_or_else(mismatch)?
            }
            EntityProperty::Scale => self.transform.scale = value.as_vector3().ok_or_else(mismatch)?,
            EntityProperty::ThirdPartyRef => {
                self.third_party_ref = value.as_str().ok_or_else(mismatch)?.to_string()
            }
            EntityProperty::LockType => {
                self.lock_type = value
                    .as_int()
                    .and_then(LockType::from_wire_id)
                    .ok_or_else(mismatch)?
            }
        }
        Ok(())
    }

    /// Full description of this entity, sent when it is created
    pub fn to_object_message(&self) -> Result<ObjectMessage, EntityError> {
        let mut components = BTreeMap::new();
        for component in self.components.values() {
            components.insert(u64::from(component.id()), component.to_field()?);
        }
        for property in EntityProperty::ALL {
            components.insert(property.key(), encode_property_value(&self.property(property))?);
        }

        Ok(ObjectMessage {
            id: self.id,
            entity_type: self.entity_type.wire_id(),
            is_transferable: self.is_transferable,
            is_persistent: self.is_persistent,
            owner_id: self.owner_id,
            parent_id: self.parent_id,
            components: Some(components),
        })
    }

    /// Builds an entity from a remote client's object message. The children
    /// list is left for the entity table to resolve.
    pub fn from_object_message(message: &ObjectMessage) -> Result<Self, EntityError> {
        let mut entity = ReplicatedEntity::new(
            message.id,
            EntityType::from_wire_id(message.entity_type)?,
            "",
            EntityTransform::default(),
            message.owner_id,
            message.parent_id,
        );
        entity.is_transferable = message.is_transferable;
        entity.is_persistent = message.is_persistent;

        if let Some(components) = &message.components {
            for (key, field) in components {
                entity.apply_field(*key, field)?;
            }
        }

        Ok(entity)
    }

    /// Applies a whole components map, or nothing if any entry fails
    pub(crate) fn apply_fields(
        &mut self,
        fields: &BTreeMap<u64, ComponentField>,
    ) -> Result<(), EntityError> {
        let mut staged = self.clone();
        for (key, field) in fields {
            staged.apply_field(*key, field)?;
        }
        *self = staged;
        Ok(())
    }

    /// Applies one entry of an object message or patch components map.
    /// Unknown view keys are ignored.
    pub(crate) fn apply_field(&mut self, key: u64, field: &ComponentField) -> Result<(), EntityError> {
        if key < COMPONENT_KEY_END_COMPONENTS {
            // Component keys always fit, they sit below 0xFF00
            let component_id = key as ComponentId;
            if field.is_deletion() {
                self.remove_component(component_id);
            } else {
                self.insert_component(Component::try_from_field(component_id, field)?);
            }
            return Ok(());
        }

        if let Some(property) = EntityProperty::from_key(key) {
            let value = decode_component_value(field)?;
            self.apply_property(property, &value)?;
        }
        Ok(())
    }
}
