use strata_shared::{
    decode_component_value, ComponentField, EventMessage, LogLevel, LogSink, ReplicatedValue,
};

use crate::events::{
    error::EventError,
    network_event::{
        AccessControlChangedData, AssetChangeType, AssetDetailBlobChangedData,
        AsyncCallCompletedData, ConversationEventData, HotspotSequenceChangedData, NetworkEvent,
        NetworkEventData, NetworkEventKind, PermissionChangeType, SequenceChangedData,
        SequenceUpdateType, SpaceUserRole,
    },
};

const ASSET_DETAIL_BLOB_CHANGED: &str = "AssetDetailBlobChangedEvent";
const CONVERSATION: &str = "ConversationEvent";
const SEQUENCE_CHANGED: &str = "SequenceChangedEvent";
const ACCESS_CONTROL_CHANGED: &str = "AccessControlChangedEvent";
const ASYNC_CALL_COMPLETED: &str = "AsyncCallCompletedEvent";

const HOTSPOT_KEY_PREFIX: &str = "Hotspots";

// Keys used by access control events
const ACCESS_CONTROL_SPACE_ID: u64 = 1;
const ACCESS_CONTROL_USER_ROLES: u64 = 100;
const ACCESS_CONTROL_CHANGE_TYPE: u64 = 101;
const ACCESS_CONTROL_USER_ID: u64 = 102;

/// Decodes every argument of a general event. Arguments that cannot be
/// decoded are logged and replaced by `ReplicatedValue::Invalid`.
pub(crate) fn decode_general_values(message: &EventMessage, log: &dyn LogSink) -> Vec<ReplicatedValue> {
    message
        .decode_values()
        .into_iter()
        .map(|value| {
            value.unwrap_or_else(|error| {
                log.log(
                    LogLevel::Error,
                    &format!("Event {}: {}", message.event_type, error),
                );
                ReplicatedValue::Invalid
            })
        })
        .collect()
}

/// Reads an envelope into a typed event, or a general one when the name is
/// outside the typed set
pub(crate) fn deserialize_event(
    message: &EventMessage,
    log: &dyn LogSink,
) -> Result<NetworkEvent, EventError> {
    let data = match NetworkEventKind::try_from_name(&message.event_type) {
        Ok(NetworkEventKind::AssetDetailBlobChanged) => {
            NetworkEventData::AssetDetailBlobChanged(asset_detail_blob_changed(message, log)?)
        }
        Ok(NetworkEventKind::Conversation) => NetworkEventData::Conversation(conversation(message)?),
        Ok(NetworkEventKind::SequenceChanged) => {
            NetworkEventData::SequenceChanged(sequence_changed(message, log)?)
        }
        Ok(NetworkEventKind::AccessControlChanged) => {
            NetworkEventData::AccessControlChanged(access_control_changed(message, log)?)
        }
        Ok(NetworkEventKind::AsyncCallCompleted) => {
            NetworkEventData::AsyncCallCompleted(async_call_completed(message)?)
        }
        Err(_) => NetworkEventData::General(decode_general_values(message, log)),
    };

    Ok(NetworkEvent {
        event_name: message.event_type.clone(),
        sender_client_id: message.sender_client_id,
        recipient_client_id: message.recipient_client_id,
        data,
    })
}

fn field<'a>(
    message: &'a EventMessage,
    event: &'static str,
    index: u64,
) -> Result<&'a ComponentField, EventError> {
    message
        .components
        .get(&index)
        .ok_or(EventError::MissingArgument { event, index })
}

fn string_at(message: &EventMessage, event: &'static str, index: u64) -> Result<String, EventError> {
    match decode_component_value(field(message, event, index)?)? {
        ReplicatedValue::String(value) => Ok(value),
        _ => Err(EventError::ArgumentType {
            event,
            index,
            expected: "string",
        }),
    }
}

fn int_at(message: &EventMessage, event: &'static str, index: u64) -> Result<i64, EventError> {
    decode_component_value(field(message, event, index)?)?
        .as_int()
        .ok_or(EventError::ArgumentType {
            event,
            index,
            expected: "integer",
        })
}

/// Sequence keys arrive URI-encoded
fn decode_key(key: &str) -> String {
    urlencoding::decode(key)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| key.to_string())
}

fn asset_detail_blob_changed(
    message: &EventMessage,
    log: &dyn LogSink,
) -> Result<AssetDetailBlobChangedData, EventError> {
    let change_type = match int_at(message, ASSET_DETAIL_BLOB_CHANGED, 0)? {
        0 => AssetChangeType::Created,
        1 => AssetChangeType::Updated,
        2 => AssetChangeType::Deleted,
        other => {
            log.log(
                LogLevel::Error,
                &format!(
                    "{} - AssetChangeType {} is not supported.",
                    ASSET_DETAIL_BLOB_CHANGED, other
                ),
            );
            AssetChangeType::Invalid
        }
    };

    Ok(AssetDetailBlobChangedData {
        change_type,
        asset_id: string_at(message, ASSET_DETAIL_BLOB_CHANGED, 1)?,
        version: string_at(message, ASSET_DETAIL_BLOB_CHANGED, 2)?,
        asset_type: string_at(message, ASSET_DETAIL_BLOB_CHANGED, 3)?,
        asset_collection_id: string_at(message, ASSET_DETAIL_BLOB_CHANGED, 4)?,
    })
}

fn conversation(message: &EventMessage) -> Result<ConversationEventData, EventError> {
    Ok(ConversationEventData {
        message_type: int_at(message, CONVERSATION, 0)?,
        conversation_id: string_at(message, CONVERSATION, 1)?,
        created_timestamp: string_at(message, CONVERSATION, 2)?,
        edited_timestamp: string_at(message, CONVERSATION, 3)?,
        user_id: string_at(message, CONVERSATION, 4)?,
        message: string_at(message, CONVERSATION, 5)?,
        message_id: string_at(message, CONVERSATION, 6)?,
    })
}

fn sequence_changed(
    message: &EventMessage,
    log: &dyn LogSink,
) -> Result<SequenceChangedData, EventError> {
    if message.components.len() != 3 {
        return Err(EventError::ArgumentCount {
            event: SEQUENCE_CHANGED,
            expected: 3,
            found: message.components.len(),
        });
    }

    let update_type = match int_at(message, SEQUENCE_CHANGED, 0)? {
        0 => SequenceUpdateType::Create,
        1 => SequenceUpdateType::Update,
        2 => {
            log.log(
                LogLevel::Warning,
                &format!(
                    "{} - Rename is no longer a supported update type.",
                    SEQUENCE_CHANGED
                ),
            );
            SequenceUpdateType::Invalid
        }
        3 => SequenceUpdateType::Delete,
        other => {
            log.log(
                LogLevel::Error,
                &format!("{} - Unknown update type {}.", SEQUENCE_CHANGED, other),
            );
            SequenceUpdateType::Invalid
        }
    };

    let key = decode_key(&string_at(message, SEQUENCE_CHANGED, 1)?);
    let new_key = match decode_component_value(field(message, SEQUENCE_CHANGED, 2)?)? {
        ReplicatedValue::String(new_key) => Some(decode_key(&new_key)),
        _ => None,
    };

    let hotspot = hotspot_data(&key, new_key.as_deref());

    Ok(SequenceChangedData {
        update_type,
        key,
        new_key,
        hotspot,
    })
}

fn hotspot_data(key: &str, new_key: Option<&str>) -> Option<HotspotSequenceChangedData> {
    let segment = |key: &str, index: usize| key.split(':').nth(index).unwrap_or("").to_string();

    if key.split(':').next() != Some(HOTSPOT_KEY_PREFIX) {
        return None;
    }

    Some(HotspotSequenceChangedData {
        space_id: segment(key, 1),
        name: segment(key, 2),
        new_name: new_key.map(|new_key| segment(new_key, 2)).unwrap_or_default(),
    })
}

fn access_control_changed(
    message: &EventMessage,
    log: &dyn LogSink,
) -> Result<AccessControlChangedData, EventError> {
    if message.components.is_empty() {
        return Err(EventError::NoComponents {
            event: ACCESS_CONTROL_CHANGED,
        });
    }

    let roles_field = field(message, ACCESS_CONTROL_CHANGED, ACCESS_CONTROL_USER_ROLES)?;
    let role_type_error = || EventError::ArgumentType {
        event: ACCESS_CONTROL_CHANGED,
        index: ACCESS_CONTROL_USER_ROLES,
        expected: "string array",
    };
    let mut user_roles = Vec::new();
    for role in roles_field.value.try_as_array().map_err(|_| role_type_error())? {
        let role = role.try_as_str().map_err(|_| role_type_error())?;
        user_roles.push(match role {
            "viewer" => SpaceUserRole::User,
            "creator" => SpaceUserRole::Moderator,
            "owner" => SpaceUserRole::Owner,
            other => {
                log.log(
                    LogLevel::Error,
                    &format!("{} - Unsupported user role {}.", ACCESS_CONTROL_CHANGED, other),
                );
                SpaceUserRole::Invalid
            }
        });
    }

    let change_type = match string_at(message, ACCESS_CONTROL_CHANGED, ACCESS_CONTROL_CHANGE_TYPE)?.as_str() {
        "Created" => PermissionChangeType::Created,
        "Updated" => PermissionChangeType::Updated,
        "Removed" => PermissionChangeType::Removed,
        other => {
            log.log(
                LogLevel::Error,
                &format!(
                    "{} - Unsupported permission change type {}.",
                    ACCESS_CONTROL_CHANGED, other
                ),
            );
            PermissionChangeType::Invalid
        }
    };

    Ok(AccessControlChangedData {
        space_id: string_at(message, ACCESS_CONTROL_CHANGED, ACCESS_CONTROL_SPACE_ID)?,
        user_roles,
        change_type,
        user_id: string_at(message, ACCESS_CONTROL_CHANGED, ACCESS_CONTROL_USER_ID)?,
    })
}

fn async_call_completed(message: &EventMessage) -> Result<AsyncCallCompletedData, EventError> {
    Ok(AsyncCallCompletedData {
        operation_name: string_at(message, ASYNC_CALL_COMPLETED, 0)?,
        reference_id: string_at(message, ASYNC_CALL_COMPLETED, 1)?,
        reference_type: string_at(message, ASYNC_CALL_COMPLETED, 2)?,
    })
}
