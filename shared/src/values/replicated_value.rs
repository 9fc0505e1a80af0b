use super::vector::{Vector2, Vector3, Vector4};

/// Discriminant of a `ReplicatedValue`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicatedValueType {
    Invalid,
    Boolean,
    Integer,
    Float,
    String,
    Vector2,
    Vector3,
    Vector4,
}

/// A primitive value that can appear as an entity property or an event argument
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReplicatedValue {
    /// Empty value, produced when the wire carried `null`
    #[default]
    Invalid,
    Boolean(bool),
    Integer(i64),
    Float(f32),
    String(String),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
}

impl ReplicatedValue {
    pub fn value_type(&self) -> ReplicatedValueType {
        match self {
            ReplicatedValue::Invalid => ReplicatedValueType::Invalid,
            ReplicatedValue::Boolean(_) => ReplicatedValueType::Boolean,
            ReplicatedValue::Integer(_) => ReplicatedValueType::Integer,
            ReplicatedValue::Float(_) => ReplicatedValueType::Float,
            ReplicatedValue::String(_) => ReplicatedValueType::String,
            ReplicatedValue::Vector2(_) => ReplicatedValueType::Vector2,
            ReplicatedValue::Vector3(_) => ReplicatedValueType::Vector3,
            ReplicatedValue::Vector4(_) => ReplicatedValueType::Vector4,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, ReplicatedValue::Invalid)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ReplicatedValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ReplicatedValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            ReplicatedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ReplicatedValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_vector2(&self) -> Option<Vector2> {
        match self {
            ReplicatedValue::Vector2(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<Vector3> {
        match self {
            ReplicatedValue::Vector3(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vector4(&self) -> Option<Vector4> {
        match self {
            ReplicatedValue::Vector4(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for ReplicatedValue {
    fn from(value: bool) -> Self {
        ReplicatedValue::Boolean(value)
    }
}

impl From<i64> for ReplicatedValue {
    fn from(value: i64) -> Self {
        ReplicatedValue::Integer(value)
    }
}

impl From<f32> for ReplicatedValue {
    fn from(value: f32) -> Self {
        ReplicatedValue::Float(value)
    }
}

impl From<&str> for ReplicatedValue {
    fn from(value: &str) -> Self {
        ReplicatedValue::String(value.to_string())
    }
}

impl From<String> for ReplicatedValue {
    fn from(value: String) -> Self {
        ReplicatedValue::String(value)
    }
}

impl From<Vector2> for ReplicatedValue {
    fn from(value: Vector2) -> Self {
        ReplicatedValue::Vector2(value)
    }
}

impl From<Vector3> for ReplicatedValue {
    fn from(value: Vector3) -> Self {
        ReplicatedValue::Vector3(value)
    }
}

impl From<Vector4> for ReplicatedValue {
    fn from(value: Vector4) -> Self {
        ReplicatedValue::Vector4(value)
    }
}
