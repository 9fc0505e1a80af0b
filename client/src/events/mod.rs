pub mod deserialize;
pub mod dispatcher;
pub mod error;
pub mod event_source;
pub mod network_event;
