use strata_client::shared::{
    EventMessage, ObjectMessage, ObjectPatch, ReplicatedValue, WireValue, ALL_CLIENTS_ID,
};

/// `OnEventMessage` payload carrying one event built from `args`
pub fn event_payload(event_type: &str, sender_client_id: u64, args: &[ReplicatedValue]) -> WireValue {
    let message = EventMessage::new(event_type, sender_client_id, ALL_CLIENTS_ID, args).unwrap();
    WireValue::Array(vec![message.to_wire()])
}

pub fn object_message_payload(message: &ObjectMessage) -> WireValue {
    WireValue::Array(vec![message.to_wire()])
}

pub fn object_patch_payload(patch: &ObjectPatch) -> WireValue {
    WireValue::Array(vec![patch.to_wire()])
}

/// `PageScopedObjects` response holding `messages` out of `total_count`
pub fn scoped_objects_page(messages: &[ObjectMessage], total_count: u64) -> WireValue {
    let items = messages.iter().map(object_message_payload).collect();
    WireValue::Array(vec![WireValue::Array(items), WireValue::UInteger(total_count)])
}
