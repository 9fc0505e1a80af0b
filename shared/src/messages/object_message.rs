use std::collections::BTreeMap;

use crate::{
    messages::{component_data::ComponentField, error::EnvelopeError},
    wire::value::WireValue,
};

fn components_to_wire(components: &Option<BTreeMap<u64, ComponentField>>) -> WireValue {
    match components {
        Some(components) => WireValue::UintMap(
            components
                .iter()
                .map(|(key, field)| (*key, field.to_wire()))
                .collect(),
        ),
        None => WireValue::Null,
    }
}

fn components_from_wire(
    value: &WireValue,
) -> Result<Option<BTreeMap<u64, ComponentField>>, EnvelopeError> {
    if value.is_null() {
        return Ok(None);
    }
    let mut components = BTreeMap::new();
    for (key, raw_field) in value.try_as_uint_map()? {
        components.insert(*key, ComponentField::try_from_wire(raw_field)?);
    }
    Ok(Some(components))
}

/// Full description of an entity, sent when it is created:
/// `[id, type, is_transferable, is_persistent, owner_id, parent_or_null, components]`
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMessage {
    pub id: u64,
    pub entity_type: u64,
    pub is_transferable: bool,
    pub is_persistent: bool,
    pub owner_id: u64,
    pub parent_id: Option<u64>,
    pub components: Option<BTreeMap<u64, ComponentField>>,
}

impl ObjectMessage {
    pub fn to_wire(&self) -> WireValue {
        WireValue::Array(vec![
            WireValue::UInteger(self.id),
            WireValue::UInteger(self.entity_type),
            WireValue::Bool(self.is_transferable),
            WireValue::Bool(self.is_persistent),
            WireValue::UInteger(self.owner_id),
            WireValue::from(self.parent_id),
            components_to_wire(&self.components),
        ])
    }

    pub fn try_from_wire(value: &WireValue) -> Result<Self, EnvelopeError> {
        Ok(Self {
            id: value.try_element(0)?.try_as_u64()?,
            entity_type: value.try_element(1)?.try_as_u64()?,
            is_transferable: value.try_element(2)?.try_as_bool()?,
            is_persistent: value.try_element(3)?.try_as_bool()?,
            owner_id: value.try_element(4)?.try_as_u64()?,
            parent_id: value.try_element(5)?.try_as_optional_u64()?,
            components: components_from_wire(value.try_element(6)?)?,
        })
    }
}

/// Delta for one entity:
/// `[id, owner_id, destroy, should_update_parent, parent_or_null, components]`.
///
/// `parent_id` is only meaningful when `should_update_parent` is set, where
/// `None` re-roots the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatch {
    pub id: u64,
    pub owner_id: u64,
    pub destroy: bool,
    pub should_update_parent: bool,
    pub parent_id: Option<u64>,
    pub components: Option<BTreeMap<u64, ComponentField>>,
}

impl ObjectPatch {
    pub fn destroy(id: u64, owner_id: u64) -> Self {
        Self {
            id,
            owner_id,
            destroy: true,
            should_update_parent: false,
            parent_id: None,
            components: None,
        }
    }

    pub fn reparent(id: u64, owner_id: u64, parent_id: Option<u64>) -> Self {
        Self {
            id,
            owner_id,
            destroy: false,
            should_update_parent: true,
            parent_id,
            components: None,
        }
    }

    pub fn to_wire(&self) -> WireValue {
        WireValue::Array(vec![
            WireValue::UInteger(self.id),
            WireValue::UInteger(self.owner_id),
            WireValue::Bool(self.destroy),
            WireValue::Bool(self.should_update_parent),
            WireValue::from(self.parent_id),
            components_to_wire(&self.components),
        ])
    }

    pub fn try_from_wire(value: &WireValue) -> Result<Self, EnvelopeError> {
        Ok(Self {
            id: value.try_element(0)?.try_as_u64()?,
            owner_id: value.try_element(1)?.try_as_u64()?,
            destroy: value.try_element(2)?.try_as_bool()?,
            should_update_parent: value.try_element(3)?.try_as_bool()?,
            parent_id: value.try_element(4)?.try_as_optional_u64()?,
            components: components_from_wire(value.try_element(5)?)?,
        })
    }
}
