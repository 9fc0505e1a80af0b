//! # Strata Client
//! Joins a shared space through a relay, keeps a replicated entity graph in
//! sync, routes multiplexed network events to listeners, and takes part in
//! per-scope leader election.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

#[macro_use]
extern crate cfg_if;

cfg_if! {
    if #[cfg(all(target_arch = "wasm32", not(feature = "wbindgen")))]
    {
        compile_error!("wasm target for 'strata_client' crate requires the 'wbindgen' feature to be enabled.");
    }
}

pub mod transport;
pub mod shared {
    pub use strata_shared::{
        Clock, ComponentField, ErrorCode, EventMessage, Instant, ItemComponentDataType,
        LogCrateSink, LogLevel, LogSink, ObjectMessage, ObjectPatch, OperationResult, PushEvent,
        RelayMethod, ReplicatedValue, ReplicatedValueType, ResultCode, SystemClock, Vector2,
        Vector3, Vector4, WireError, WireValue, ALL_CLIENTS_ID, ALL_ENTITIES_ID,
    };
}

mod connection;
mod election;
mod events;
mod executor;
mod world;

pub use connection::{
    config::SessionConfig,
    error::ChainError,
    session_connection::{
        ResultCallback, SessionConnection, SessionEventCallback, SessionHandle,
        CONNECTED_MESSAGE, DISCONNECT_REASON_CLIENT, DISCONNECT_REASON_SHUTDOWN,
        START_ERROR_MESSAGE,
    },
};
pub use election::{config::ElectionConfig, scope_leadership::ScopeLeaderElection};
pub use events::{
    dispatcher::{
        EventDispatcher, EventRegistration, NetworkEventCallback, ParameterisedCallback,
        SystemEventHandler,
    },
    error::EventError,
    event_source::EventSource,
    network_event::{
        AccessControlChangedData, AssetChangeType, AssetDetailBlobChangedData,
        AsyncCallCompletedData, ConversationEventData, HotspotSequenceChangedData, NetworkEvent,
        NetworkEventData, NetworkEventKind, PermissionChangeType, SequenceChangedData,
        SequenceUpdateType, SpaceUserRole,
    },
};
pub use executor::{Executor, InlineExecutor, Task};
pub use world::{
    component::{Component, ComponentId, ComponentKind, PropertyKey},
    config::{ReplicationConfig, ReplicationMode},
    engine::{
        DestroyCallback, EntityCreatedCallback, EntityReplicationEngine, FetchCompleteCallback,
    },
    entity::{EntityId, EntityProperty, EntityTransform, EntityType, LockType, ReplicatedEntity},
    error::EntityError,
    patch_sink::{ObjectIdsCallback, PageCallback, PatchCallback, PatchSink, ScopedObjectsPage},
};
