use crate::{
    messages::error::EnvelopeError,
    values::{
        replicated_value::ReplicatedValue,
        vector::{Vector2, Vector3, Vector4},
    },
    wire::value::WireValue,
};

/// Type tags understood by the relay for component and event fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemComponentDataType {
    Bool,
    NullableBool,
    Int64,
    NullableInt64,
    UInt64,
    Float,
    FloatArray,
    NullableFloatArray,
    Double,
    NullableDouble,
    String,
    StringArray,
    NullableUInt16,
    UInt16Dictionary,
    StringDictionary,
    DeleteComponent,
}

impl ItemComponentDataType {
    pub fn tag(self) -> u64 {
        match self {
            ItemComponentDataType::Bool => 0,
            ItemComponentDataType::NullableBool => 1,
            ItemComponentDataType::Int64 => 16,
            ItemComponentDataType::NullableInt64 => 17,
            ItemComponentDataType::UInt64 => 20,
            ItemComponentDataType::Float => 24,
            ItemComponentDataType::FloatArray => 26,
            ItemComponentDataType::NullableFloatArray => 27,
            ItemComponentDataType::Double => 28,
            ItemComponentDataType::NullableDouble => 29,
            ItemComponentDataType::String => 32,
            ItemComponentDataType::StringArray => 33,
            ItemComponentDataType::NullableUInt16 => 51,
            ItemComponentDataType::UInt16Dictionary => 54,
            ItemComponentDataType::StringDictionary => 55,
            ItemComponentDataType::DeleteComponent => 56,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        let data_type = match tag {
            0 => ItemComponentDataType::Bool,
            1 => ItemComponentDataType::NullableBool,
            16 => ItemComponentDataType::Int64,
            17 => ItemComponentDataType::NullableInt64,
            20 => ItemComponentDataType::UInt64,
            24 => ItemComponentDataType::Float,
            26 => ItemComponentDataType::FloatArray,
            27 => ItemComponentDataType::NullableFloatArray,
            28 => ItemComponentDataType::Double,
            29 => ItemComponentDataType::NullableDouble,
            32 => ItemComponentDataType::String,
            33 => ItemComponentDataType::StringArray,
            51 => ItemComponentDataType::NullableUInt16,
            54 => ItemComponentDataType::UInt16Dictionary,
            55 => ItemComponentDataType::StringDictionary,
            56 => ItemComponentDataType::DeleteComponent,
            _ => return None,
        };
        Some(data_type)
    }
}

/// One entry of a components map, `[type_tag, [value]]` on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentField {
    pub data_type: ItemComponentDataType,
    pub value: WireValue,
}

impl ComponentField {
    pub fn new(data_type: ItemComponentDataType, value: WireValue) -> Self {
        Self { data_type, value }
    }

    /// Marker field recording that a component was removed
    pub fn deleted() -> Self {
        Self::new(ItemComponentDataType::DeleteComponent, WireValue::Null)
    }

    pub fn is_deletion(&self) -> bool {
        self.data_type == ItemComponentDataType::DeleteComponent
    }

    pub fn to_wire(&self) -> WireValue {
        let fields = match self.data_type {
            ItemComponentDataType::DeleteComponent => Vec::new(),
            _ => vec![self.value.clone()],
        };
        WireValue::Array(vec![
            WireValue::UInteger(self.data_type.tag()),
            WireValue::Array(fields),
        ])
    }

    pub fn try_from_wire(value: &WireValue) -> Result<Self, EnvelopeError> {
        let tag = value.try_element(0)?.try_as_u64()?;
        let data_type =
            ItemComponentDataType::from_tag(tag).ok_or(EnvelopeError::UnsupportedDataType { tag })?;
        // Every field type the relay sends carries a single value
        let field_value = value
            .try_element(1)?
            .try_as_array()?
            .first()
            .cloned()
            .unwrap_or_default();

        Ok(Self::new(data_type, field_value))
    }
}

fn float_array(components: &[f32]) -> WireValue {
    WireValue::Array(
        components
            .iter()
            .map(|component| WireValue::Double(f64::from(*component)))
            .collect(),
    )
}

fn encode_value(
    value: &ReplicatedValue,
    bool_type: ItemComponentDataType,
    int_type: ItemComponentDataType,
    float_type: ItemComponentDataType,
) -> Result<ComponentField, EnvelopeError> {
    let field = match value {
        ReplicatedValue::Boolean(value) => ComponentField::new(bool_type, WireValue::Bool(*value)),
        ReplicatedValue::Integer(value) => ComponentField::new(int_type, WireValue::Integer(*value)),
        ReplicatedValue::Float(value) => {
            ComponentField::new(float_type, WireValue::Double(f64::from(*value)))
        }
        ReplicatedValue::String(value) => {
            ComponentField::new(ItemComponentDataType::String, WireValue::String(value.clone()))
        }
        ReplicatedValue::Vector2(value) => ComponentField::new(
            ItemComponentDataType::FloatArray,
            float_array(&[value.x, value.y]),
        ),
        ReplicatedValue::Vector3(value) => ComponentField::new(
            ItemComponentDataType::FloatArray,
            float_array(&[value.x, value.y, value.z]),
        ),
        ReplicatedValue::Vector4(value) => ComponentField::new(
            ItemComponentDataType::FloatArray,
            float_array(&[value.x, value.y, value.z, value.w]),
        ),
        ReplicatedValue::Invalid => {
            return Err(EnvelopeError::UnsupportedArgument {
                value_type: value.value_type(),
            })
        }
    };
    Ok(field)
}

/// Encodes an event argument using the nullable field types events are sent with
pub fn encode_event_value(value: &ReplicatedValue) -> Result<ComponentField, EnvelopeError> {
    encode_value(
        value,
        ItemComponentDataType::NullableBool,
        ItemComponentDataType::NullableInt64,
        ItemComponentDataType::NullableDouble,
    )
}

/// Encodes an entity or component property
pub fn encode_property_value(value: &ReplicatedValue) -> Result<ComponentField, EnvelopeError> {
    encode_value(
        value,
        ItemComponentDataType::Bool,
        ItemComponentDataType::Int64,
        ItemComponentDataType::Float,
    )
}

/// Decodes a single field into a replicated value. A `null` field decodes to
/// `ReplicatedValue::Invalid`.
pub fn decode_component_value(field: &ComponentField) -> Result<ReplicatedValue, EnvelopeError> {
    if field.value.is_null() {
        return Ok(ReplicatedValue::Invalid);
    }

    let value = match field.data_type {
        ItemComponentDataType::Bool | ItemComponentDataType::NullableBool => {
            ReplicatedValue::Boolean(field.value.try_as_bool()?)
        }
        ItemComponentDataType::Int64
        | ItemComponentDataType::NullableInt64
        | ItemComponentDataType::UInt64
        | ItemComponentDataType::NullableUInt16 => {
            ReplicatedValue::Integer(field.value.try_as_i64()?)
        }
        ItemComponentDataType::Float
        | ItemComponentDataType::Double
        | ItemComponentDataType::NullableDouble => {
            ReplicatedValue::Float(field.value.try_as_f64()? as f32)
        }
        ItemComponentDataType::String => {
            ReplicatedValue::String(field.value.try_as_str()?.to_string())
        }
        ItemComponentDataType::FloatArray | ItemComponentDataType::NullableFloatArray => {
            let elements = field
                .value
                .try_as_array()?
                .iter()
                .map(|element| element.try_as_f64().map(|component| component as f32))
                .collect::<Result<Vec<f32>, _>>()?;
            match elements.as_slice() {
                [x, y] => ReplicatedValue::Vector2(Vector2::new(*x, *y)),
                [x, y, z] => ReplicatedValue::Vector3(Vector3::new(*x, *y, *z)),
                [x, y, z, w] => ReplicatedValue::Vector4(Vector4::new(*x, *y, *z, *w)),
                _ => {
                    return Err(EnvelopeError::UnsupportedVectorLength {
                        length: elements.len(),
                    })
                }
            }
        }
        ItemComponentDataType::StringArray
        | ItemComponentDataType::UInt16Dictionary
        | ItemComponentDataType::StringDictionary
        | ItemComponentDataType::DeleteComponent => {
            return Err(EnvelopeError::UnsupportedDataType {
                tag: field.data_type.tag(),
            })
        }
    };
    Ok(value)
}
