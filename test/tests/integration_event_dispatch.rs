/// INTEGRATION TESTS: Network event dispatch
///
/// Frames pushed through `OnEventMessage` reach plain callbacks, system
/// handlers and keyed registrations; outgoing events are wrapped in an
/// envelope and sent through `SendEventMessage`.

use std::sync::Arc;

use parking_lot::Mutex;

use strata_client::shared::{
    ErrorCode, EventMessage, LogLevel, PushEvent, RelayMethod, ReplicatedValue, WireValue,
    ALL_CLIENTS_ID,
};
use strata_client::{
    AsyncCallCompletedData, EventDispatcher, EventError, EventRegistration, NetworkEvent,
    NetworkEventData, NetworkEventKind, SystemEventHandler,
};
use strata_test::{
    assert_failed_with, assert_logged, capture_result, connected_session, event_payload,
    LocalTransport, TestSession,
};

type Received = Arc<Mutex<Vec<(bool, Vec<ReplicatedValue>)>>>;

fn listening(test_session: &TestSession) -> EventDispatcher {
    let dispatcher = EventDispatcher::new(&test_session.handle(), test_session.log.clone());
    dispatcher.start_event_message_listening();
    dispatcher
}

fn recording_callback(dispatcher: &EventDispatcher, event_name: &str) -> Received {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    dispatcher.listen_network_event(
        event_name,
        Arc::new(move |success, values: &[ReplicatedValue]| {
            sink.lock().push((success, values.to_vec()))
        }),
    );
    received
}

fn recording_registration(
    dispatcher: &EventDispatcher,
    receiver_id: &str,
    event_name: &str,
) -> Arc<Mutex<Vec<NetworkEvent>>> {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    dispatcher
        .listen_network_event_as(
            receiver_id,
            event_name,
            Arc::new(move |event: &NetworkEvent| sink.lock().push(event.clone())),
        )
        .unwrap();
    received
}

#[derive(Default)]
struct RecordingSystemHandler {
    payloads: Mutex<Vec<WireValue>>,
}

impl SystemEventHandler for RecordingSystemHandler {
    fn on_event(&self, payload: &WireValue) {
        self.payloads.lock().push(payload.clone());
    }
}

#[test]
fn listening_registers_the_push_handler() {
    let test_session = connected_session(1);
    assert!(!test_session.transport.has_handler(PushEvent::OnEventMessage));

    let _dispatcher = listening(&test_session);

    assert!(test_session.transport.has_handler(PushEvent::OnEventMessage));
}

/// Every callback registered for a name receives the decoded arguments
#[test]
fn callbacks_receive_decoded_arguments() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    let first = recording_callback(&dispatcher, "Chat");
    let second = recording_callback(&dispatcher, "Chat");
    let args = vec![
        ReplicatedValue::String("hello".to_string()),
        ReplicatedValue::Integer(3),
        ReplicatedValue::Boolean(true),
    ];

    test_session
        .transport
        .push(PushEvent::OnEventMessage, event_payload("Chat", 4, &args));

    assert_eq!(*first.lock(), vec![(true, args.clone())]);
    assert_eq!(*second.lock(), vec![(true, args)]);
}

/// A system handler takes the raw payload and hides the event from callbacks
#[test]
fn system_handler_receives_events_exclusively() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    let callback = recording_callback(&dispatcher, "Presence");
    let handler = Arc::new(RecordingSystemHandler::default());
    dispatcher.listen_network_event_for_system("Presence", handler.clone());

    let payload = event_payload("Presence", 8, &[ReplicatedValue::Integer(1)]);
    test_session
        .transport
        .push(PushEvent::OnEventMessage, payload.clone());

    assert_eq!(*handler.payloads.lock(), vec![payload]);
    assert!(callback.lock().is_empty());
}

#[test]
fn system_handler_registration_replaces_the_previous_one() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    let replaced = Arc::new(RecordingSystemHandler::default());
    let current = Arc::new(RecordingSystemHandler::default());
    dispatcher.listen_network_event_for_system("Presence", replaced.clone());
    dispatcher.listen_network_event_for_system("Presence", current.clone());

    test_session
        .transport
        .push(PushEvent::OnEventMessage, event_payload("Presence", 8, &[]));

    assert!(replaced.payloads.lock().is_empty());
    assert_eq!(current.payloads.lock().len(), 1);
}

#[test]
fn unregistered_events_are_logged_and_dropped() {
    let test_session = connected_session(1);
    let _dispatcher = listening(&test_session);

    test_session
        .transport
        .push(PushEvent::OnEventMessage, event_payload("Ping", 2, &[]));

    assert_logged!(
        test_session.log,
        LogLevel::Verbose,
        "Received event Ping has no registrations, discarding..."
    );
}

#[test]
fn stop_listening_removes_callbacks_and_handler() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    let callback = recording_callback(&dispatcher, "Presence");
    let handler = Arc::new(RecordingSystemHandler::default());
    dispatcher.listen_network_event_for_system("Presence", handler.clone());

    dispatcher.stop_listen_network_event("Presence");
    test_session
        .transport
        .push(PushEvent::OnEventMessage, event_payload("Presence", 8, &[]));

    assert!(callback.lock().is_empty());
    assert!(handler.payloads.lock().is_empty());
    assert_logged!(test_session.log, LogLevel::Verbose, "has no registrations");
}

/// An envelope that cannot be read reports failure to each callback
#[test]
fn malformed_envelope_reports_failure() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    let callback = recording_callback(&dispatcher, "Chat");

    let frame = WireValue::Array(vec![
        WireValue::from("Chat"),
        WireValue::from("not a client id"),
        WireValue::Null,
        WireValue::Null,
    ]);
    test_session
        .transport
        .push(PushEvent::OnEventMessage, WireValue::Array(vec![frame]));

    assert_eq!(*callback.lock(), vec![(false, Vec::new())]);
    assert_logged!(test_session.log, LogLevel::Error, "Failed to read event Chat");
}

#[test]
fn null_payload_is_discarded() {
    let test_session = connected_session(1);
    let _dispatcher = listening(&test_session);

    test_session
        .transport
        .push(PushEvent::OnEventMessage, WireValue::Null);

    assert_logged!(test_session.log, LogLevel::Log, "payload was empty");
}

/// Keyed registrations receive the typed form of events in the fixed set
#[test]
fn keyed_registration_receives_typed_event() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    let received = recording_registration(&dispatcher, "jobs-panel", "AsyncCallCompleted");

    test_session.transport.push(
        PushEvent::OnEventMessage,
        event_payload(
            "AsyncCallCompleted",
            0,
            &[
                ReplicatedValue::String("DuplicateSpace".to_string()),
                ReplicatedValue::String("space-2".to_string()),
                ReplicatedValue::String("GroupId".to_string()),
            ],
        ),
    );

    let received = received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].kind(), Some(NetworkEventKind::AsyncCallCompleted));
    assert_eq!(received[0].sender_client_id, 0);
    assert_eq!(
        received[0].data,
        NetworkEventData::AsyncCallCompleted(AsyncCallCompletedData {
            operation_name: "DuplicateSpace".to_string(),
            reference_id: "space-2".to_string(),
            reference_type: "GroupId".to_string(),
        })
    );
}

#[test]
fn keyed_registration_for_general_event() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    let received = recording_registration(&dispatcher, "hud", "Score");
    let plain = recording_callback(&dispatcher, "Score");

    test_session.transport.push(
        PushEvent::OnEventMessage,
        event_payload("Score", 6, &[ReplicatedValue::Integer(42)]),
    );

    assert_eq!(
        received.lock()[0].data,
        NetworkEventData::General(vec![ReplicatedValue::Integer(42)])
    );
    assert_eq!(plain.lock().len(), 1, "Plain callbacks still run");
}

#[test]
fn duplicate_registration_is_rejected() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    recording_registration(&dispatcher, "hud", "Score");

    let result = dispatcher.listen_network_event_as("hud", "Score", Arc::new(|_: &NetworkEvent| {}));

    assert_eq!(
        result,
        Err(EventError::DuplicateRegistration {
            receiver_id: "hud".to_string(),
            event_name: "Score".to_string(),
        })
    );
    assert_logged!(test_session.log, LogLevel::Warning, "already registered");
    assert_eq!(dispatcher.all_registrations().len(), 1);
}

#[test]
fn registrations_are_removed_per_receiver() {
    let test_session = connected_session(1);
    let dispatcher = listening(&test_session);
    recording_registration(&dispatcher, "hud", "Score");
    recording_registration(&dispatcher, "hud", "Chat");
    let kept = recording_registration(&dispatcher, "log", "Score");

    assert_eq!(dispatcher.stop_listen_all_network_events("hud"), 2);
    assert_eq!(dispatcher.stop_listen_all_network_events("hud"), 0);
    assert_eq!(
        dispatcher.all_registrations(),
        vec![EventRegistration::new("log", "Score")]
    );

    test_session.transport.push(
        PushEvent::OnEventMessage,
        event_payload("Score", 6, &[ReplicatedValue::Integer(1)]),
    );
    assert_eq!(kept.lock().len(), 1);

    dispatcher
        .stop_listen_registration(&EventRegistration::new("log", "Score"))
        .unwrap();
    assert_eq!(
        dispatcher.stop_listen_registration(&EventRegistration::new("log", "Score")),
        Err(EventError::RegistrationNotFound {
            receiver_id: "log".to_string(),
            event_name: "Score".to_string(),
        })
    );
}

#[test]
fn send_network_event_broadcasts_an_envelope() {
    let test_session = connected_session(5);
    let dispatcher = listening(&test_session);

    let (slot, callback) = capture_result();
    dispatcher.send_network_event(
        "Wave",
        &[ReplicatedValue::String("hi".to_string()), ReplicatedValue::Float(0.5)],
        callback,
    );

    assert!(slot.get().map_or(false, |result| result.is_success()));
    let sent = test_session.transport.calls_to(RelayMethod::SendEventMessage);
    assert_eq!(sent.len(), 1);
    let message = EventMessage::try_from_wire(sent[0].try_element(0).unwrap()).unwrap();
    assert_eq!(message.event_type, "Wave");
    assert_eq!(message.sender_client_id, 5);
    assert_eq!(message.recipient_client_id, None);
    assert_eq!(message.components.len(), 2);
}

#[test]
fn send_network_event_to_one_client() {
    let test_session = connected_session(5);
    let dispatcher = listening(&test_session);

    dispatcher.send_network_event_to_client("Poke", &[], 9, None);
    dispatcher.send_network_event_to_client("Poke", &[], ALL_CLIENTS_ID, None);

    let recipients: Vec<Option<u64>> = test_session
        .transport
        .calls_to(RelayMethod::SendEventMessage)
        .iter()
        .map(|args| {
            EventMessage::try_from_wire(args.try_element(0).unwrap())
                .unwrap()
                .recipient_client_id
        })
        .collect();
    assert_eq!(recipients, vec![Some(9), None]);
}

#[test]
fn sending_requires_a_connection() {
    let test_session = TestSession::new(LocalTransport::new());
    let dispatcher = listening(&test_session);

    let (slot, callback) = capture_result();
    dispatcher.send_network_event("Wave", &[], callback);

    assert_failed_with!(slot, ErrorCode::NotConnected);
    assert!(test_session.transport.calls().is_empty());
}

/// Arguments without a wire form fail before anything is sent
#[test]
fn unsendable_arguments_fail_locally() {
    let test_session = connected_session(5);
    let dispatcher = listening(&test_session);

    let (slot, callback) = capture_result();
    dispatcher.send_network_event("Wave", &[ReplicatedValue::Invalid], callback);

    assert_failed_with!(slot, ErrorCode::Unknown);
    assert!(test_session
        .transport
        .calls_to(RelayMethod::SendEventMessage)
        .is_empty());
}

/// Looking up a name outside the typed set panics; the checked variant
/// returns an error
#[test]
fn typed_lookup_of_unknown_name_panics() {
    let result = std::panic::catch_unwind(|| NetworkEventKind::from_name("NotAnEvent"));
    assert!(result.is_err(), "from_name must panic on an unknown name");

    assert_eq!(
        NetworkEventKind::try_from_name("NotAnEvent"),
        Err(EventError::UnknownEventName {
            name: "NotAnEvent".to_string()
        })
    );
    assert_eq!(
        NetworkEventKind::from_name("ConversationSystem"),
        NetworkEventKind::Conversation
    );
}
