/// Sentinel entity id meaning "every entity owned by this client"
pub const ALL_ENTITIES_ID: u64 = u64::MAX;

/// Sentinel recipient id meaning "broadcast to every client in scope"
pub const ALL_CLIENTS_ID: u64 = u64::MAX;

/// Component ids live below this key; entity view properties (name,
/// transform, lock, ...) occupy the keys from here upward.
pub const COMPONENT_KEY_END_COMPONENTS: u64 = 0xFF00;

/// Reserved key inside a component's property dictionary holding the
/// component's kind id
pub const COMPONENT_TYPE_PROPERTY_KEY: u64 = 0xFFFF;

/// Methods invoked against the relay. The string forms are part of the wire
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayMethod {
    DeleteObjects,
    GetClientId,
    StartListening,
    StopListening,
    SetScopes,
    ResetScopes,
    SetAllowSelfMessaging,
    SendEventMessage,
    SendObjectMessage,
    SendObjectPatches,
    GenerateObjectIds,
    /// `[exclude_client_owned, include_client_owned_persistent, skip, limit]`,
    /// answered with `[[object_message_frame...], total_count]`
    PageScopedObjects,
    SendObjectNotFound,
    SendScopeLeaderHeartbeat,
}

impl RelayMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayMethod::DeleteObjects => "DeleteObjects",
            RelayMethod::GetClientId => "GetClientId",
            RelayMethod::StartListening => "StartListening",
            RelayMethod::StopListening => "StopListening",
            RelayMethod::SetScopes => "SetScopes",
            RelayMethod::ResetScopes => "ResetScopes",
            RelayMethod::SetAllowSelfMessaging => "SetAllowSelfMessaging",
            RelayMethod::SendEventMessage => "SendEventMessage",
            RelayMethod::SendObjectMessage => "SendObjectMessage",
            RelayMethod::SendObjectPatches => "SendObjectPatches",
            RelayMethod::GenerateObjectIds => "GenerateObjectIds",
            RelayMethod::PageScopedObjects => "PageScopedObjects",
            RelayMethod::SendObjectNotFound => "SendObjectNotFound",
            RelayMethod::SendScopeLeaderHeartbeat => "SendScopeLeaderHeartbeat",
        }
    }
}

/// Events pushed from the relay to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushEvent {
    /// Multiplexed event frames, `[[event_type, sender, recipient, components]]`
    OnEventMessage,
    /// The relay is superseding this session, payload `[reason]`
    OnRequestToDisconnect,
    /// A remote client created an entity
    OnObjectMessage,
    /// A remote client changed or destroyed entities
    OnObjectPatch,
    /// The relay wants this client to re-send an entity, payload `[entity_id]`
    OnRequestToSendObject,
}

impl PushEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushEvent::OnEventMessage => "OnEventMessage",
            PushEvent::OnRequestToDisconnect => "OnRequestToDisconnect",
            PushEvent::OnObjectMessage => "OnObjectMessage",
            PushEvent::OnObjectPatch => "OnObjectPatch",
            PushEvent::OnRequestToSendObject => "OnRequestToSendObject",
        }
    }
}
