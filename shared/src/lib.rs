//! # Strata Shared
//! Common functionality shared between the strata client & its test harness.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

cfg_if! {
    if #[cfg(all(target_arch = "wasm32", not(feature = "wbindgen")))]
    {
        compile_error!("wasm target for 'strata_shared' crate requires the 'wbindgen' feature to be enabled.");
    }
}

mod backends;
mod logging;
mod messages;
mod protocol;
mod result;
mod values;
mod wire;

pub use backends::{Clock, Instant, SystemClock};
pub use logging::{LogCrateSink, LogLevel, LogSink};
pub use messages::{
    component_data::{
        decode_component_value, encode_event_value, encode_property_value, ComponentField,
        ItemComponentDataType,
    },
    error::EnvelopeError,
    event_message::EventMessage,
    object_message::{ObjectMessage, ObjectPatch},
};
pub use protocol::{
    PushEvent, RelayMethod, ALL_CLIENTS_ID, ALL_ENTITIES_ID, COMPONENT_KEY_END_COMPONENTS,
    COMPONENT_TYPE_PROPERTY_KEY,
};
pub use result::{parse_error_code, ErrorCode, OperationResult, ResultCode};
pub use values::{
    replicated_value::{ReplicatedValue, ReplicatedValueType},
    vector::{Vector2, Vector3, Vector4},
};
pub use wire::{error::WireError, value::WireValue};
