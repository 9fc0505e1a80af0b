use std::collections::BTreeMap;

use strata_shared::{
    decode_component_value, encode_property_value, ComponentField, EnvelopeError,
    ItemComponentDataType, ReplicatedValue, Vector3, Vector4, WireError, WireValue,
    COMPONENT_TYPE_PROPERTY_KEY,
};

use crate::world::error::EntityError;

/// Id of a component, unique within its entity
pub type ComponentId = u16;

/// Key of a property inside a component
pub type PropertyKey = u16;

/// The closed set of component kinds an entity can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Custom,
    StaticModel,
    AnimatedModel,
    Light,
    Image,
    Text,
    Audio,
    Button,
    ScriptData,
    Collision,
}

impl ComponentKind {
    /// Numeric kind stored under the reserved component type key
    pub fn type_id(self) -> u64 {
        match self {
            ComponentKind::Custom => 1,
            ComponentKind::StaticModel => 2,
            ComponentKind::AnimatedModel => 3,
            ComponentKind::Light => 4,
            ComponentKind::Image => 5,
            ComponentKind::Text => 6,
            ComponentKind::Audio => 7,
            ComponentKind::Button => 8,
            ComponentKind::ScriptData => 9,
            ComponentKind::Collision => 10,
        }
    }

    pub fn from_type_id(type_id: u64) -> Option<Self> {
        let kind = match type_id {
            1 => ComponentKind::Custom,
            2 => ComponentKind::StaticModel,
            3 => ComponentKind::AnimatedModel,
            4 => ComponentKind::Light,
            5 => ComponentKind::Image,
            6 => ComponentKind::Text,
            7 => ComponentKind::Audio,
            8 => ComponentKind::Button,
            9 => ComponentKind::ScriptData,
            10 => ComponentKind::Collision,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether an entity may carry more than one component of this kind
    pub fn allows_multiple(self) -> bool {
        match self {
            ComponentKind::ScriptData => false,
            ComponentKind::Custom
            | ComponentKind::StaticModel
            | ComponentKind::AnimatedModel
            | ComponentKind::Light
            | ComponentKind::Image
            | ComponentKind::Text
            | ComponentKind::Audio
            | ComponentKind::Button
            | ComponentKind::Collision => true,
        }
    }

    /// Property values a freshly added component of this kind starts with
    pub fn default_properties(self) -> BTreeMap<PropertyKey, ReplicatedValue> {
        let mut properties = BTreeMap::new();
        let mut insert = |key: PropertyKey, value: ReplicatedValue| {
            properties.insert(key, value);
        };

        match self {
            ComponentKind::Custom => {}
            ComponentKind::StaticModel => {
                insert(0, "".into());
                insert(1, "".into());
                insert_transform(&mut insert, 2);
                insert(5, true.into());
            }
            ComponentKind::AnimatedModel => {
                insert(0, "".into());
                insert(1, "".into());
                insert_transform(&mut insert, 2);
                insert(5, true.into());
                insert(6, true.into());
                insert(7, false.into());
                insert(8, (-1_i64).into());
            }
            ComponentKind::Light => {
                insert(0, 0_i64.into());
                insert(1, Vector3::new(255.0, 255.0, 255.0).into());
                insert(2, 5000.0_f32.into());
                insert(3, 1000.0_f32.into());
                insert(4, 0.0_f32.into());
                insert(5, std::f32::consts::FRAC_PI_4.into());
                insert(6, Vector3::ZERO.into());
                insert(7, Vector4::IDENTITY.into());
                insert(8, true.into());
            }
            ComponentKind::Image => {
                insert(0, "".into());
                insert(1, "".into());
                insert_transform(&mut insert, 2);
                insert(5, true.into());
                insert(6, 0_i64.into());
            }
            ComponentKind::Text => {
                insert(0, "".into());
                insert(1, Vector3::ONE.into());
                insert(2, Vector3::ZERO.into());
                insert(3, true.into());
                insert(4, 1.0_f32.into());
                insert(5, 1.0_f32.into());
                insert_transform(&mut insert, 6);
                insert(9, true.into());
            }
            ComponentKind::Audio => {
                insert(0, Vector3::ZERO.into());
                insert(1, 0_i64.into());
                insert(2, 0_i64.into());
                insert(3, "".into());
                insert(4, "".into());
                insert(5, 10.0_f32.into());
                insert(6, false.into());
                insert(7, 0.0_f32.into());
                insert(8, 1.0_f32.into());
                insert(9, true.into());
            }
            ComponentKind::Button => {
                insert(0, "".into());
                insert(1, "".into());
                insert(2, "".into());
                insert_transform(&mut insert, 3);
                insert(6, true.into());
                insert(7, true.into());
            }
            ComponentKind::ScriptData => {
                insert(0, "".into());
                insert(1, 0_i64.into());
                insert(2, 0_i64.into());
            }
            ComponentKind::Collision => {
                insert_transform(&mut insert, 0);
                insert(3, 0_i64.into());
                insert(4, 0_i64.into());
                insert(5, "".into());
                insert(6, "".into());
            }
        }

        properties
    }
}

/// Position, rotation and scale at three consecutive keys
fn insert_transform(insert: &mut impl FnMut(PropertyKey, ReplicatedValue), first_key: PropertyKey) {
    insert(first_key, Vector3::ZERO.into());
    insert(first_key + 1, Vector4::IDENTITY.into());
    insert(first_key + 2, Vector3::ONE.into());
}

/// A typed bag of properties attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    id: ComponentId,
    kind: ComponentKind,
    properties: BTreeMap<PropertyKey, ReplicatedValue>,
}

impl Component {
    pub fn new(id: ComponentId, kind: ComponentKind) -> Self {
        Self {
            id,
            kind,
            properties: kind.default_properties(),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn property(&self, key: PropertyKey) -> Option<&ReplicatedValue> {
        self.properties.get(&key)
    }

    pub fn properties(&self) -> &BTreeMap<PropertyKey, ReplicatedValue> {
        &self.properties
    }

    pub(crate) fn set_property(&mut self, key: PropertyKey, value: ReplicatedValue) {
        self.properties.insert(key, value);
    }

    /// Encodes the component as a `UINT16_DICTIONARY` field, with the kind
    /// stored under `COMPONENT_TYPE_PROPERTY_KEY`. Invalid values are omitted.
    pub(crate) fn to_field(&self) -> Result<ComponentField, EnvelopeError> {
        let mut dictionary = BTreeMap::new();
        for (key, value) in self.properties.iter().filter(|(_, value)| value.is_valid()) {
            dictionary.insert(u64::from(*key), encode_property_value(value)?.to_wire());
        }
        dictionary.insert(
            COMPONENT_TYPE_PROPERTY_KEY,
            ComponentField::new(
                ItemComponentDataType::UInt64,
                WireValue::UInteger(self.kind.type_id()),
            )
            .to_wire(),
        );

        Ok(ComponentField::new(
            ItemComponentDataType::UInt16Dictionary,
            WireValue::UintMap(dictionary),
        ))
    }

    pub(crate) fn try_from_field(
        id: ComponentId,
        field: &ComponentField,
    ) -> Result<Self, EntityError> {
        if field.data_type != ItemComponentDataType::UInt16Dictionary {
            return Err(EnvelopeError::UnsupportedDataType {
                tag: field.data_type.tag(),
            }
            .into());
        }

        let dictionary = field.value.try_as_uint_map().map_err(EnvelopeError::from)?;
        let kind_field = dictionary
            .get(&COMPONENT_TYPE_PROPERTY_KEY)
            .ok_or(WireError::MissingKey {
                key: COMPONENT_TYPE_PROPERTY_KEY,
            })
            .map_err(EnvelopeError::from)?;
        let type_id = ComponentField::try_from_wire(kind_field)?
            .value
            .try_as_u64()
            .map_err(EnvelopeError::from)?;
        let kind = ComponentKind::from_type_id(type_id)
            .ok_or(EntityError::UnknownComponentKind { type_id })?;

        let mut properties = BTreeMap::new();
        for (key, raw_field) in dictionary {
            if *key == COMPONENT_TYPE_PROPERTY_KEY {
                continue;
            }
            let key = PropertyKey::try_from(*key)
                .map_err(|_| WireError::IntegerOutOfRange {
                    value: i128::from(*key),
                    target: "u16",
                })
                .map_err(EnvelopeError::from)?;
            let value = decode_component_value(&ComponentField::try_from_wire(raw_field)?)?;
            properties.insert(key, value);
        }

        Ok(Self {
            id,
            kind,
            properties,
        })
    }
}
