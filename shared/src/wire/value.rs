use std::collections::BTreeMap;

use super::error::WireError;

/// Structured value exchanged with the relay.
///
/// This is the decoded form of whatever the transport puts on the wire; the
/// byte encoding itself belongs to the transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WireValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    UInteger(u64),
    Double(f64),
    String(String),
    Array(Vec<WireValue>),
    UintMap(BTreeMap<u64, WireValue>),
}

impl WireValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Integer(_) => "integer",
            WireValue::UInteger(_) => "uinteger",
            WireValue::Double(_) => "double",
            WireValue::String(_) => "string",
            WireValue::Array(_) => "array",
            WireValue::UintMap(_) => "uint_map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    fn unexpected(&self, expected: &'static str) -> WireError {
        WireError::UnexpectedType {
            expected,
            found: self.type_name(),
        }
    }

    pub fn try_as_bool(&self) -> Result<bool, WireError> {
        match self {
            WireValue::Bool(value) => Ok(*value),
            other => Err(other.unexpected("bool")),
        }
    }

    /// Reads an unsigned integer, accepting non-negative signed integers too
    pub fn try_as_u64(&self) -> Result<u64, WireError> {
        match self {
            WireValue::UInteger(value) => Ok(*value),
            WireValue::Integer(value) => {
                u64::try_from(*value).map_err(|_| WireError::IntegerOutOfRange {
                    value: i128::from(*value),
                    target: "u64",
                })
            }
            other => Err(other.unexpected("uinteger")),
        }
    }

    /// Reads a signed integer, accepting unsigned integers that fit
    pub fn try_as_i64(&self) -> Result<i64, WireError> {
        match self {
            WireValue::Integer(value) => Ok(*value),
            WireValue::UInteger(value) => {
                i64::try_from(*value).map_err(|_| WireError::IntegerOutOfRange {
                    value: i128::from(*value),
                    target: "i64",
                })
            }
            other => Err(other.unexpected("integer")),
        }
    }

    /// Reads a floating point number, widening integers
    pub fn try_as_f64(&self) -> Result<f64, WireError> {
        match self {
            WireValue::Double(value) => Ok(*value),
            WireValue::Integer(value) => Ok(*value as f64),
            WireValue::UInteger(value) => Ok(*value as f64),
            other => Err(other.unexpected("double")),
        }
    }

    pub fn try_as_str(&self) -> Result<&str, WireError> {
        match self {
            WireValue::String(value) => Ok(value.as_str()),
            other => Err(other.unexpected("string")),
        }
    }

    pub fn try_as_array(&self) -> Result<&[WireValue], WireError> {
        match self {
            WireValue::Array(values) => Ok(values.as_slice()),
            other => Err(other.unexpected("array")),
        }
    }

    pub fn try_as_uint_map(&self) -> Result<&BTreeMap<u64, WireValue>, WireError> {
        match self {
            WireValue::UintMap(map) => Ok(map),
            other => Err(other.unexpected("uint_map")),
        }
    }

    /// Indexes into an array value
    pub fn try_element(&self, index: usize) -> Result<&WireValue, WireError> {
        let values = self.try_as_array()?;
        values.get(index).ok_or(WireError::IndexOutOfBounds {
            index,
            length: values.len(),
        })
    }

    /// Reads an optional unsigned integer, where `null` means absent
    pub fn try_as_optional_u64(&self) -> Result<Option<u64>, WireError> {
        if self.is_null() {
            return Ok(None);
        }
        self.try_as_u64().map(Some)
    }
}

impl From<bool> for WireValue {
    fn from(value: bool) -> Self {
        WireValue::Bool(value)
    }
}

impl From<i64> for WireValue {
    fn from(value: i64) -> Self {
        WireValue::Integer(value)
    }
}

impl From<u64> for WireValue {
    fn from(value: u64) -> Self {
        WireValue::UInteger(value)
    }
}

impl From<f64> for WireValue {
    fn from(value: f64) -> Self {
        WireValue::Double(value)
    }
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        WireValue::String(value.to_string())
    }
}

impl From<String> for WireValue {
    fn from(value: String) -> Self {
        WireValue::String(value)
    }
}

impl From<Vec<WireValue>> for WireValue {
    fn from(values: Vec<WireValue>) -> Self {
        WireValue::Array(values)
    }
}

impl From<BTreeMap<u64, WireValue>> for WireValue {
    fn from(map: BTreeMap<u64, WireValue>) -> Self {
        WireValue::UintMap(map)
    }
}

impl From<Option<u64>> for WireValue {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(value) => WireValue::UInteger(value),
            None => WireValue::Null,
        }
    }
}
