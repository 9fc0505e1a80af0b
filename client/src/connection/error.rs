use thiserror::Error;

use strata_shared::{parse_error_code, ErrorCode};

use crate::transport::TransportError;

/// Cancels the remainder of an asynchronous chain.
///
/// Carries the classified error handed to the caller's callback and the
/// human-readable message that is logged (and, for the connect chain, used
/// as the disconnection reason).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ChainError {
    pub code: ErrorCode,
    pub message: String,
}

impl ChainError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classifies a transport failure by the error token embedded in its
    /// message, reporting it under `message`
    pub fn from_transport(error: &TransportError, message: impl Into<String>) -> Self {
        Self {
            code: parse_error_code(&error.to_string()),
            message: message.into(),
        }
    }

    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotConnected, message)
    }
}
