use thiserror::Error;

/// Failures reported through a transport's error channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The relay or the transport raised an error with a description
    #[error("{message}")]
    Remote {
        message: String,
    },

    /// The operation needs a started transport
    #[error("No Connection!")]
    NotConnected,

    /// The transport failed without describing why
    #[error("Unrecognized transport failure")]
    Unrecognized,
}

impl TransportError {
    pub fn remote(message: impl Into<String>) -> Self {
        TransportError::Remote {
            message: message.into(),
        }
    }

    /// True when the failure carried a description the client can inspect
    pub fn is_recognized(&self) -> bool {
        !matches!(self, TransportError::Unrecognized)
    }
}
