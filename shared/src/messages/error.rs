use thiserror::Error;

use crate::{values::replicated_value::ReplicatedValueType, wire::error::WireError};

/// Errors that can occur while building or reading event and object envelopes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The envelope did not have the expected structure
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] WireError),

    /// A value of this type has no wire representation as an event argument
    #[error("Unsupported event argument type {value_type:?}. Only bool, integer, float, string and 2/3/4-vector arguments can be sent")]
    UnsupportedArgument {
        value_type: ReplicatedValueType,
    },

    /// The component carried a type tag this client does not decode
    #[error("Unsupported component data type tag {tag}")]
    UnsupportedDataType {
        tag: u64,
    },

    /// Float arrays only map onto 2, 3 or 4 component vectors
    #[error("Unsupported float array of length {length}. Only Vector2, Vector3 and Vector4 arguments are accepted")]
    UnsupportedVectorLength {
        length: usize,
    },
}
