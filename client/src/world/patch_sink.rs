use strata_shared::{
    EnvelopeError, ErrorCode, ObjectMessage, ObjectPatch, RelayMethod, WireValue,
};

use crate::connection::{
    error::ChainError,
    session_connection::{SessionHandle, StepMessages},
};

pub type ObjectIdsCallback = Box<dyn FnOnce(Result<Vec<u64>, ChainError>) + Send>;
pub type PatchCallback = Box<dyn FnOnce(Result<(), ChainError>) + Send>;
pub type PageCallback = Box<dyn FnOnce(Result<ScopedObjectsPage, ChainError>) + Send>;

/// One page of the entities other clients have in this client's scopes
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedObjectsPage {
    pub objects: Vec<ObjectMessage>,
    /// Number of entities across every page
    pub total_count: u64,
}

impl ScopedObjectsPage {
    fn try_from_wire(value: &WireValue) -> Result<Self, EnvelopeError> {
        let objects = value
            .try_element(0)?
            .try_as_array()?
            .iter()
            .map(|item| ObjectMessage::try_from_wire(item.try_element(0)?))
            .collect::<Result<Vec<_>, EnvelopeError>>()?;
        let total_count = value.try_element(1)?.try_as_u64()?;
        Ok(Self {
            objects,
            total_count,
        })
    }
}

/// Where the replication engine sends entity changes
pub trait PatchSink: Send + Sync {
    /// Id of the local client, `None` until the session has connected
    fn client_id(&self) -> Option<u64>;

    /// Whether the relay echoes this client's own patches back to it
    fn allow_self_messaging(&self) -> bool;

    fn generate_object_ids(&self, count: u64, callback: ObjectIdsCallback);

    fn send_object_message(&self, message: ObjectMessage, callback: PatchCallback);

    fn send_object_patches(&self, patches: Vec<ObjectPatch>, callback: PatchCallback);

    /// Fetches entities owned by other clients, `limit` at a time from `skip`
    fn page_scoped_objects(&self, skip: u64, limit: u64, callback: PageCallback);

    /// Tells the relay a requested entity is not known here
    fn send_object_not_found(&self, entity_id: u64, callback: PatchCallback);
}

const GENERATE_OBJECT_IDS: StepMessages = StepMessages {
    not_connected: "OnlineRealtimeEngine::GenerateObjectIds, Error not connected.",
    failed: "OnlineRealtimeEngine::GenerateObjectIds, Error when generating object ids.",
};
const SEND_OBJECT_MESSAGE: StepMessages = StepMessages {
    not_connected: "OnlineRealtimeEngine::SendObjectMessage, Error not connected.",
    failed: "OnlineRealtimeEngine::SendObjectMessage, Error when sending object message.",
};
const PAGE_SCOPED_OBJECTS: StepMessages = StepMessages {
    not_connected: "OnlineRealtimeEngine::GetEntitiesPaged, Error not connected.",
    failed: "OnlineRealtimeEngine::GetEntitiesPaged, Failed to retrieve paged entities.",
};
const SEND_OBJECT_NOT_FOUND: StepMessages = StepMessages {
    not_connected: "OnlineRealtimeEngine::SendObjectNotFound, Error not connected.",
    failed: "OnlineRealtimeEngine::SendObjectNotFound, Error when reporting a missing object.",
};
const SEND_OBJECT_PATCHES: StepMessages = StepMessages {
    not_connected: "OnlineRealtimeEngine::SendObjectPatches, Error not connected.",
    failed: "OnlineRealtimeEngine::SendObjectPatches, Error when sending object patches.",
};

impl PatchSink for SessionHandle {
    fn client_id(&self) -> Option<u64> {
        SessionHandle::client_id(self)
    }

    fn allow_self_messaging(&self) -> bool {
        SessionHandle::allow_self_messaging(self)
    }

    fn generate_object_ids(&self, count: u64, callback: ObjectIdsCallback) {
        self.invoke_step(
            RelayMethod::GenerateObjectIds,
            WireValue::Array(vec![WireValue::UInteger(count)]),
            &GENERATE_OBJECT_IDS,
            Box::new(move |result| {
                callback(result.and_then(|value| {
                    value
                        .try_as_array()
                        .and_then(|ids| ids.iter().map(WireValue::try_as_u64).collect())
                        .map_err(|error| {
                            ChainError::new(
                                ErrorCode::Unknown,
                                format!("{} {}", GENERATE_OBJECT_IDS.failed, error),
                            )
                        })
                }))
            }),
        );
    }

    fn send_object_message(&self, message: ObjectMessage, callback: PatchCallback) {
        self.invoke_step(
            RelayMethod::SendObjectMessage,
            WireValue::Array(vec![message.to_wire()]),
            &SEND_OBJECT_MESSAGE,
            Box::new(move |result| callback(result.map(|_| ()))),
        );
    }

    fn send_object_patches(&self, patches: Vec<ObjectPatch>, callback: PatchCallback) {
        let patches = patches.iter().map(ObjectPatch::to_wire).collect();
        self.invoke_step(
            RelayMethod::SendObjectPatches,
            WireValue::Array(vec![WireValue::Array(patches)]),
            &SEND_OBJECT_PATCHES,
            Box::new(move |result| callback(result.map(|_| ()))),
        );
    }

    fn page_scoped_objects(&self, skip: u64, limit: u64, callback: PageCallback) {
        let args = WireValue::Array(vec![
            WireValue::Bool(true),
            WireValue::Bool(true),
            WireValue::UInteger(skip),
            WireValue::UInteger(limit),
        ]);
        self.invoke_step(
            RelayMethod::PageScopedObjects,
            args,
            &PAGE_SCOPED_OBJECTS,
            Box::new(move |result| {
                callback(result.and_then(|value| {
                    ScopedObjectsPage::try_from_wire(&value).map_err(|error| {
                        ChainError::new(
                            ErrorCode::Unknown,
                            format!("{} {}", PAGE_SCOPED_OBJECTS.failed, error),
                        )
                    })
                }))
            }),
        );
    }

    fn send_object_not_found(&self, entity_id: u64, callback: PatchCallback) {
        self.invoke_step(
            RelayMethod::SendObjectNotFound,
            WireValue::Array(vec![WireValue::UInteger(entity_id)]),
            &SEND_OBJECT_NOT_FOUND,
            Box::new(move |result| callback(result.map(|_| ()))),
        );
    }
}
