use std::collections::BTreeMap;

use crate::{
    messages::{
        component_data::{decode_component_value, encode_event_value, ComponentField},
        error::EnvelopeError,
    },
    protocol::ALL_CLIENTS_ID,
    values::replicated_value::ReplicatedValue,
    wire::value::WireValue,
};

/// Envelope of a multiplexed event:
/// `[event_type, sender_client_id, recipient_or_null, components_map]`
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    pub event_type: String,
    pub sender_client_id: u64,
    /// `None` broadcasts to every client in scope
    pub recipient_client_id: Option<u64>,
    pub components: BTreeMap<u64, ComponentField>,
}

impl EventMessage {
    /// Builds an outgoing envelope. Arguments are indexed in order; a target
    /// of `ALL_CLIENTS_ID` becomes a broadcast.
    pub fn new(
        event_type: &str,
        sender_client_id: u64,
        target_client_id: u64,
        args: &[ReplicatedValue],
    ) -> Result<Self, EnvelopeError> {
        let mut components = BTreeMap::new();
        for (index, arg) in (0u64..).zip(args.iter()) {
            components.insert(index, encode_event_value(arg)?);
        }

        let recipient_client_id = if target_client_id == ALL_CLIENTS_ID {
            None
        } else {
            Some(target_client_id)
        };

        Ok(Self {
            event_type: event_type.to_string(),
            sender_client_id,
            recipient_client_id,
            components,
        })
    }

    pub fn to_wire(&self) -> WireValue {
        let components = self
            .components
            .iter()
            .map(|(key, field)| (*key, field.to_wire()))
            .collect::<BTreeMap<u64, WireValue>>();

        WireValue::Array(vec![
            WireValue::String(self.event_type.clone()),
            WireValue::UInteger(self.sender_client_id),
            WireValue::from(self.recipient_client_id),
            WireValue::UintMap(components),
        ])
    }

    /// Reads an envelope. A `null` components map is read as empty.
    pub fn try_from_wire(value: &WireValue) -> Result<Self, EnvelopeError> {
        let event_type = value.try_element(0)?.try_as_str()?.to_string();
        let sender_client_id = value.try_element(1)?.try_as_u64()?;
        let recipient_client_id = value.try_element(2)?.try_as_optional_u64()?;

        let mut components = BTreeMap::new();
        let raw_components = value.try_element(3)?;
        if !raw_components.is_null() {
            for (key, raw_field) in raw_components.try_as_uint_map()? {
                components.insert(*key, ComponentField::try_from_wire(raw_field)?);
            }
        }

        Ok(Self {
            event_type,
            sender_client_id,
            recipient_client_id,
            components,
        })
    }

    /// Decodes every argument in index order. Each entry is decoded
    /// independently so one unsupported argument does not hide the others.
    pub fn decode_values(&self) -> Vec<Result<ReplicatedValue, EnvelopeError>> {
        self.components
            .values()
            .map(decode_component_value)
            .collect()
    }
}
