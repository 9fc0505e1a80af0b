use strata_shared::ReplicatedValue;

use crate::events::error::EventError;

/// The network events that are read into typed payloads. Every other event
/// name carries a general list of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkEventKind {
    AssetDetailBlobChanged,
    Conversation,
    SequenceChanged,
    AccessControlChanged,
    AsyncCallCompleted,
}

impl NetworkEventKind {
    pub const ALL: [NetworkEventKind; 5] = [
        NetworkEventKind::AssetDetailBlobChanged,
        NetworkEventKind::Conversation,
        NetworkEventKind::SequenceChanged,
        NetworkEventKind::AccessControlChanged,
        NetworkEventKind::AsyncCallCompleted,
    ];

    /// Event type string as sent by the relay
    pub fn event_name(self) -> &'static str {
        match self {
            NetworkEventKind::AssetDetailBlobChanged => "AssetDetailBlobChanged",
            NetworkEventKind::Conversation => "ConversationSystem",
            NetworkEventKind::SequenceChanged => "SequenceChanged",
            NetworkEventKind::AccessControlChanged => "AccessControlChanged",
            NetworkEventKind::AsyncCallCompleted => "AsyncCallCompleted",
        }
    }

    /// Looks up a typed event by name
    pub fn try_from_name(name: &str) -> Result<Self, EventError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.event_name() == name)
            .ok_or_else(|| EventError::UnknownEventName {
                name: name.to_string(),
            })
    }

    /// Looks up a typed event by name
    ///
    /// # Panics
    ///
    /// Panics if `name` is not one of the typed network events
    pub fn from_name(name: &str) -> Self {
        match Self::try_from_name(name) {
            Ok(kind) => kind,
            Err(error) => panic!("{}", error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetChangeType {
    Created,
    Updated,
    Deleted,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDetailBlobChangedData {
    pub change_type: AssetChangeType,
    pub asset_id: String,
    pub version: String,
    pub asset_type: String,
    pub asset_collection_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEventData {
    pub message_type: i64,
    pub conversation_id: String,
    pub created_timestamp: String,
    pub edited_timestamp: String,
    pub user_id: String,
    pub message: String,
    pub message_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceUpdateType {
    Create,
    Update,
    /// No longer sent by the relay; read as `Invalid`
    Rename,
    Delete,
    Invalid,
}

/// Sequence keys of the form `Hotspots:<space_id>:<name>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HotspotSequenceChangedData {
    pub space_id: String,
    pub name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceChangedData {
    pub update_type: SequenceUpdateType,
    pub key: String,
    pub new_key: Option<String>,
    /// Set when the key belongs to a hotspot group
    pub hotspot: Option<HotspotSequenceChangedData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceUserRole {
    User,
    Moderator,
    Owner,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionChangeType {
    Created,
    Updated,
    Removed,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControlChangedData {
    pub space_id: String,
    pub user_roles: Vec<SpaceUserRole>,
    pub change_type: PermissionChangeType,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncCallCompletedData {
    pub operation_name: String,
    pub reference_id: String,
    pub reference_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEventData {
    AssetDetailBlobChanged(AssetDetailBlobChangedData),
    Conversation(ConversationEventData),
    SequenceChanged(SequenceChangedData),
    AccessControlChanged(AccessControlChangedData),
    AsyncCallCompleted(AsyncCallCompletedData),
    /// Any event outside the typed set, arguments in index order
    General(Vec<ReplicatedValue>),
}

/// An incoming event, read from its envelope
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkEvent {
    pub event_name: String,
    pub sender_client_id: u64,
    pub recipient_client_id: Option<u64>,
    pub data: NetworkEventData,
}

impl NetworkEvent {
    /// The typed kind of this event, if it has one
    pub fn kind(&self) -> Option<NetworkEventKind> {
        NetworkEventKind::try_from_name(&self.event_name).ok()
    }
}
