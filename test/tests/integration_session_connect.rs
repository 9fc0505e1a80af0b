/// INTEGRATION TESTS: Session connect sequence
///
/// Drives a SessionConnection against a LocalTransport and checks the order
/// of relay calls, the state machine, and how failures surface.

use std::sync::Arc;

use parking_lot::Mutex;

use strata_client::shared::{ErrorCode, LogLevel, RelayMethod, ResultCode, WireValue};
use strata_client::transport::ConnectionState;
use strata_client::{SessionConfig, SessionConnection, CONNECTED_MESSAGE, START_ERROR_MESSAGE};
use strata_test::{
    assert_failed_with, assert_logged, capture_result, connected_session, LocalTransport,
    ManualExecutor, RecordingLogSink, TestSession, TEST_RELAY_URL,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn recorded_messages() -> (Arc<Mutex<Vec<String>>>, strata_client::SessionEventCallback) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let callback: strata_client::SessionEventCallback =
        Arc::new(move |message: &str| sink.lock().push(message.to_string()));
    (messages, callback)
}

/// Steps run strictly one after another: nothing is invoked before the
/// previous step's response arrived
#[test]
fn connect_runs_steps_in_order() {
    init_logging();
    let test_session = TestSession::new(LocalTransport::new().with_client_id(7));
    test_session.connect();

    assert_eq!(
        test_session.transport.events(),
        vec![
            "start",
            "invoke:DeleteObjects",
            "response:DeleteObjects",
            "invoke:GetClientId",
            "response:GetClientId",
            "invoke:StartListening",
            "response:StartListening",
        ]
    );
    assert_eq!(test_session.session.client_id(), Some(7));
    assert_eq!(test_session.session.connection_state(), ConnectionState::Connected);
    assert_eq!(test_session.session.pending_invocations(), 0);
}

/// The "all entities" sentinel goes out as null
#[test]
fn delete_all_entities_is_sent_as_null() {
    let test_session = connected_session(1);

    assert_eq!(
        test_session.transport.calls_to(RelayMethod::DeleteObjects),
        vec![WireValue::Array(vec![WireValue::Null])]
    );
}

#[test]
fn connection_callback_receives_connected_message() {
    let test_session = TestSession::new(LocalTransport::new());
    let (messages, callback) = recorded_messages();
    test_session.session.set_connection_callback(callback);

    test_session.connect();

    assert_eq!(*messages.lock(), vec![CONNECTED_MESSAGE.to_string()]);
    assert_logged!(test_session.log, LogLevel::Log, CONNECTED_MESSAGE);
}

#[test]
fn connect_when_connected_reports_already_connected() {
    let test_session = connected_session(2);

    let (slot, callback) = capture_result();
    test_session.session.connect(callback);

    assert_failed_with!(slot, ErrorCode::AlreadyConnected);
    assert_eq!(
        test_session.transport.events().iter().filter(|event| *event == "start").count(),
        1,
        "A second connect must not restart the transport"
    );
}

/// While the first connect waits on its continuation, a second one is told
/// the change is in progress and does not re-enter
#[test]
fn connect_while_connecting_is_in_progress() {
    let transport = LocalTransport::new();
    let executor = Arc::new(ManualExecutor::new());
    let log = Arc::new(RecordingLogSink::new());
    let session = SessionConnection::with_executor(
        SessionConfig::new(TEST_RELAY_URL),
        Arc::new(transport.clone()),
        executor.clone(),
        log.clone(),
    );

    let (first, first_callback) = capture_result();
    session.connect(first_callback);
    assert_eq!(session.connection_state(), ConnectionState::Connecting);
    assert_eq!(first.get(), None);

    let (second, second_callback) = capture_result();
    session.connect(second_callback);
    assert_eq!(
        second.get().map(|result| result.result_code),
        Some(ResultCode::InProgress)
    );
    assert_logged!(log, LogLevel::Warning, "already in progress");

    executor.run_all();

    assert!(first.get().map_or(false, |result| result.is_success()));
    assert_eq!(second.count(), 1);
    assert_eq!(session.connection_state(), ConnectionState::Connected);
    assert_eq!(
        transport.events().iter().filter(|event| *event == "start").count(),
        1
    );
}

/// A transport that fails to start reports Unknown to the caller and hands
/// the literal start failure message to the disconnection callback
#[test]
fn start_failure_reports_unknown_and_literal_message() {
    init_logging();
    let transport = LocalTransport::new();
    transport.fail_start("Failed to negotiate with the server");
    let test_session = TestSession::new(transport);
    let (messages, callback) = recorded_messages();
    test_session.session.set_disconnection_callback(callback);

    let (slot, connect_callback) = capture_result();
    test_session.session.connect(connect_callback);

    assert_failed_with!(slot, ErrorCode::Unknown);
    assert_eq!(*messages.lock(), vec![START_ERROR_MESSAGE.to_string()]);
    assert_logged!(test_session.log, LogLevel::Error, START_ERROR_MESSAGE);
    assert_eq!(test_session.session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(test_session.session.client_id(), None);
    assert_eq!(
        test_session.transport.stop_calls(),
        0,
        "A transport that never started is not stopped"
    );
}

/// A relay quota error mid-chain is classified and tears the session down
#[test]
fn quota_error_while_requesting_client_id() {
    let transport = LocalTransport::new();
    transport.fail_next(
        RelayMethod::GetClientId,
        "Hub exception: error code: Scopes_ConcurrentUsersQuota, limit reached",
    );
    let test_session = TestSession::new(transport);
    let (messages, callback) = recorded_messages();
    test_session.session.set_disconnection_callback(callback);

    let (slot, connect_callback) = capture_result();
    test_session.session.connect(connect_callback);

    assert_failed_with!(slot, ErrorCode::SpaceUserLimitExceeded);
    assert_eq!(
        *messages.lock(),
        vec!["MultiplayerConnection::RequestClientId, Error when starting requesting Client Id."
            .to_string()]
    );
    assert!(test_session.transport.calls_to(RelayMethod::StartListening).is_empty());
    assert_eq!(test_session.transport.stop_calls(), 1);
    assert_eq!(test_session.session.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn client_id_that_is_not_a_number_fails_the_connect() {
    let transport = LocalTransport::new();
    transport.respond_with(RelayMethod::GetClientId, Ok(WireValue::from("seven")));
    let test_session = TestSession::new(transport);

    let (slot, callback) = capture_result();
    test_session.session.connect(callback);

    assert_failed_with!(slot, ErrorCode::Unknown);
    assert_eq!(test_session.session.client_id(), None);
}

#[test]
fn reconnect_after_disconnect() {
    let test_session = connected_session(4);

    let (disconnected, callback) = capture_result();
    test_session.session.disconnect(callback);
    assert!(disconnected.get().map_or(false, |result| result.is_success()));
    assert_eq!(test_session.session.client_id(), None);

    test_session.connect();
    assert_eq!(test_session.session.client_id(), Some(4));
    assert_eq!(
        test_session.transport.calls_to(RelayMethod::GetClientId).len(),
        2
    );
}
