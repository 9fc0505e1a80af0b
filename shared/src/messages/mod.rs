pub mod component_data;
pub mod error;
pub mod event_message;
pub mod object_message;
