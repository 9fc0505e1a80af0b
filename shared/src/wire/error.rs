use thiserror::Error;

/// Errors raised while reading a structured value received from the relay
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The value held a different type than the reader expected
    #[error("Unexpected wire value: expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    /// An array was shorter than its layout requires
    #[error("Wire array index {index} is out of bounds for an array of length {length}")]
    IndexOutOfBounds {
        index: usize,
        length: usize,
    },

    /// An integer did not fit the width the reader asked for
    #[error("Wire integer {value} does not fit in {target}")]
    IntegerOutOfRange {
        value: i128,
        target: &'static str,
    },

    /// A keyed map was missing a required entry
    #[error("Wire map is missing required key {key}")]
    MissingKey {
        key: u64,
    },
}
