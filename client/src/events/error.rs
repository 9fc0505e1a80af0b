use thiserror::Error;

use strata_shared::EnvelopeError;

/// Errors raised while registering for, or reading, network events
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The name is not one of the typed network events
    #[error("Unknown network event name: {name}")]
    UnknownEventName { name: String },

    /// A typed event arrived with the wrong number of arguments
    #[error("{event} - Invalid arguments. Expected {expected} arguments but got {found}.")]
    ArgumentCount {
        event: &'static str,
        expected: usize,
        found: usize,
    },

    /// A typed event arrived without a required argument
    #[error("{event} - Missing argument {index}.")]
    MissingArgument { event: &'static str, index: u64 },

    /// A typed event argument held a value of the wrong type
    #[error("{event} - Argument {index} is not a {expected}.")]
    ArgumentType {
        event: &'static str,
        index: u64,
        expected: &'static str,
    },

    /// A typed event arrived with no components at all
    #[error("{event} - Event components were null.")]
    NoComponents { event: &'static str },

    /// The envelope could not be read or built
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The receiver is already registered for this event
    #[error("Receiver {receiver_id} is already registered for {event_name}")]
    DuplicateRegistration {
        receiver_id: String,
        event_name: String,
    },

    /// No registration exists for this receiver and event
    #[error("Receiver {receiver_id} is not registered for {event_name}")]
    RegistrationNotFound {
        receiver_id: String,
        event_name: String,
    },
}
