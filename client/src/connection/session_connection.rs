use std::{
    ops::Deref,
    sync::{mpsc, Arc},
};

use log::warn;
use parking_lot::Mutex;

use strata_shared::{
    parse_error_code, ErrorCode, LogLevel, LogSink, OperationResult, PushEvent, RelayMethod,
    ResultCode, WireValue, ALL_ENTITIES_ID,
};

use crate::{
    connection::{config::SessionConfig, error::ChainError},
    executor::{Executor, InlineExecutor},
    transport::{
        ConnectionState, InvokeCallback, PushHandler, RpcTransport, SendCallback, StopCallback,
        TransportError,
    },
};

pub const START_ERROR_MESSAGE: &str =
    "MultiplayerConnection::Start, Error when starting SignalR connection.";
pub const CONNECTED_MESSAGE: &str = "Successfully connected to SignalR hub.";
pub const DISCONNECT_REASON_CLIENT: &str = "Client called disconnect.";
pub const DISCONNECT_REASON_SHUTDOWN: &str = "MultiplayerConnection shutting down.";
const DISCONNECT_REASON_SERVER_DEFAULT: &str = "Disconnect requested by server.";
const CONNECTION_INTERRUPTED: &str = "Connection Interrupted.";

/// Messages reported by one relay call of a chain
pub(crate) struct StepMessages {
    pub(crate) not_connected: &'static str,
    pub(crate) failed: &'static str,
}

const DELETE_ENTITIES: StepMessages = StepMessages {
    not_connected: "MultiplayerConnection::DeleteEntities, Error not connected.",
    failed: "MultiplayerConnection::DeleteEntities, Unexpected error response from SignalR \"DeleteObjects\" invocation.",
};
const REQUEST_CLIENT_ID: StepMessages = StepMessages {
    not_connected: "MultiplayerConnection::RequestClientId, Error not connected.",
    failed: "MultiplayerConnection::RequestClientId, Error when starting requesting Client Id.",
};
const START_LISTENING: StepMessages = StepMessages {
    not_connected: "MultiplayerConnection::StartListening, Error not connected.",
    failed: "MultiplayerConnection::StartListening, Error when starting listening.",
};
const STOP_LISTENING: StepMessages = StepMessages {
    not_connected: "MultiplayerConnection::StopListening, Error not connected.",
    failed: "MultiplayerConnection::StopListening, Error when stopping listening.",
};
const SET_SCOPES: StepMessages = StepMessages {
    not_connected: "MultiplayerConnection::SetScopes, Error not connected.",
    failed: "MultiplayerConnection::SetScopes, Error when setting scopes.",
};
const RESET_SCOPES: StepMessages = StepMessages {
    not_connected: "MultiplayerConnection::ResetScopes, Error not connected.",
    failed: "MultiplayerConnection::ResetScopes, Error when resetting scopes.",
};
const SET_ALLOW_SELF_MESSAGING: StepMessages = StepMessages {
    not_connected: "MultiplayerConnection::SetAllowSelfMessagingFlag, Error not connected.",
    failed: "MultiplayerConnection::SetAllowSelfMessagingFlag, Error when setting allow self messaging flag.",
};

/// Receives the outcome of an asynchronous session operation, exactly once
pub type ResultCallback = Box<dyn FnOnce(OperationResult) + Send>;

/// Receives a human-readable message when the session's lifecycle changes
pub type SessionEventCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// One step of an asynchronous chain
pub(crate) type Continuation<T> = Box<dyn FnOnce(Result<T, ChainError>) + Send>;

pub(crate) fn respond(callback: Option<ResultCallback>, result: OperationResult) {
    if let Some(callback) = callback {
        callback(result);
    }
}

/// Runs `step` with the success value, or forwards the error straight to `next`
fn and_then<T, U>(
    result: Result<T, ChainError>,
    next: Continuation<U>,
    step: impl FnOnce(T, Continuation<U>),
) {
    match result {
        Ok(value) => step(value, next),
        Err(error) => next(Err(error)),
    }
}

struct SessionState {
    connection_state: ConnectionState,
    transport_started: bool,
    client_id: Option<u64>,
    pending_invocations: usize,
    deferred_stop: Option<StopCallback>,
    stop_issued: bool,
    allow_self_messaging: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            connection_state: ConnectionState::Disconnected,
            transport_started: false,
            client_id: None,
            pending_invocations: 0,
            deferred_stop: None,
            stop_issued: false,
            allow_self_messaging: false,
        }
    }
}

#[derive(Default)]
struct SessionCallbacks {
    connection: Option<SessionEventCallback>,
    disconnection: Option<SessionEventCallback>,
    network_interruption: Option<SessionEventCallback>,
}

struct SessionInner {
    config: SessionConfig,
    transport: Arc<dyn RpcTransport>,
    executor: Arc<dyn Executor>,
    log: Arc<dyn LogSink>,
    state: Mutex<SessionState>,
    callbacks: Mutex<SessionCallbacks>,
}

/// Shared reference to a session, handed to the subsystems that talk to the
/// relay through it
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

/// Owns the transport to the relay and drives the connect / disconnect
/// state machine.
///
/// Dropping a connected session disconnects it and waits (up to
/// `SessionConfig::shutdown_timeout`) for the transport to stop.
pub struct SessionConnection {
    handle: SessionHandle,
}

impl SessionConnection {
    /// Create a new session whose continuations run inline
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn RpcTransport>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self::with_executor(config, transport, Arc::new(InlineExecutor), log)
    }

    /// Create a new session whose continuations are handed to `executor`
    pub fn with_executor(
        config: SessionConfig,
        transport: Arc<dyn RpcTransport>,
        executor: Arc<dyn Executor>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let handle = SessionHandle {
            inner: Arc::new(SessionInner {
                config,
                transport,
                executor,
                log,
                state: Mutex::new(SessionState::new()),
                callbacks: Mutex::new(SessionCallbacks::default()),
            }),
        };
        handle.bind_push_handlers();

        Self { handle }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }
}

impl Deref for SessionConnection {
    type Target = SessionHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for SessionConnection {
    fn drop(&mut self) {
        if self.handle.connection_state() != ConnectionState::Connected {
            return;
        }

        let (sender, receiver) = mpsc::channel();
        self.handle.disconnect_with_reason(
            DISCONNECT_REASON_SHUTDOWN.to_string(),
            Box::new(move |_| {
                let _ = sender.send(());
            }),
        );

        if receiver.try_recv().is_ok() {
            return;
        }
        let timeout = self.handle.inner.config.shutdown_timeout;
        if receiver.recv_timeout(timeout).is_err() {
            warn!("Session transport did not stop within {:?} of shutdown", timeout);
        }
    }
}

impl SessionHandle {
    // Queries

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection_state
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// The id the relay assigned this client, once connected
    pub fn client_id(&self) -> Option<u64> {
        self.inner.state.lock().client_id
    }

    pub fn allow_self_messaging(&self) -> bool {
        self.inner.state.lock().allow_self_messaging
    }

    /// Number of relay invocations still waiting on a response
    pub fn pending_invocations(&self) -> usize {
        self.inner.state.lock().pending_invocations
    }

    /// State as reported by the transport itself
    pub fn transport_state(&self) -> ConnectionState {
        self.inner.transport.connection_state()
    }

    // Callbacks

    pub fn set_connection_callback(&self, callback: SessionEventCallback) {
        self.inner.callbacks.lock().connection = Some(callback);
    }

    pub fn set_disconnection_callback(&self, callback: SessionEventCallback) {
        self.inner.callbacks.lock().disconnection = Some(callback);
    }

    pub fn set_network_interruption_callback(&self, callback: SessionEventCallback) {
        self.inner.callbacks.lock().network_interruption = Some(callback);
    }

    // Lifecycle

    /// Starts the transport and runs the connect sequence.
    ///
    /// Reports `AlreadyConnected` when connected, and `ResultCode::InProgress`
    /// while a previous connect or a disconnect is still outstanding.
    pub fn connect(&self, callback: Option<ResultCallback>) {
        let rejection = {
            let mut state = self.inner.state.lock();
            let current = state.connection_state;
            match current {
                ConnectionState::Disconnected => {
                    state.connection_state = ConnectionState::Connecting;
                    state.client_id = None;
                    None
                }
                ConnectionState::Connected => {
                    Some(OperationResult::failed(ErrorCode::AlreadyConnected))
                }
                ConnectionState::Connecting | ConnectionState::Disconnecting => {
                    Some(OperationResult::in_progress())
                }
            }
        };

        if let Some(result) = rejection {
            if result.result_code == ResultCode::InProgress {
                self.log(
                    LogLevel::Warning,
                    "MultiplayerConnection::Connect, a connection change is already in progress.",
                );
            }
            respond(callback, result);
            return;
        }

        let session = self.clone();
        self.connect_chain(Box::new(move |result| {
            session.finish_connect(result, callback)
        }));
    }

    /// Disconnects from the relay, once every in-flight invocation has
    /// completed.
    ///
    /// Reports `NotConnected` when disconnected and `ResultCode::InProgress`
    /// while a connect is still running. A request made while disconnecting
    /// joins the pending stop.
    pub fn disconnect(&self, callback: Option<ResultCallback>) {
        match self.connection_state() {
            ConnectionState::Disconnected => {
                respond(callback, OperationResult::failed(ErrorCode::NotConnected));
                return;
            }
            ConnectionState::Connecting => {
                self.log(
                    LogLevel::Warning,
                    "MultiplayerConnection::Disconnect, a connection is still being established.",
                );
                respond(callback, OperationResult::in_progress());
                return;
            }
            ConnectionState::Connected | ConnectionState::Disconnecting => {}
        }

        self.disconnect_with_reason(
            DISCONNECT_REASON_CLIENT.to_string(),
            Box::new(move |result| {
                let outcome = match result {
                    Ok(()) => OperationResult::success(),
                    Err(error) => OperationResult::failed(parse_error_code(&error.to_string())),
                };
                respond(callback, outcome);
            }),
        );
    }

    // Relay operations

    /// Subscribes this client to a space's scopes
    pub fn set_scopes(&self, space_id: &str, callback: Option<ResultCallback>) {
        let args = WireValue::Array(vec![WireValue::Array(vec![WireValue::from(space_id)])]);
        self.run_operation(RelayMethod::SetScopes, args, &SET_SCOPES, callback, |_| {});
    }

    pub fn reset_scopes(&self, callback: Option<ResultCallback>) {
        self.run_operation(
            RelayMethod::ResetScopes,
            WireValue::Array(Vec::new()),
            &RESET_SCOPES,
            callback,
            |_| {},
        );
    }

    pub fn stop_listening(&self, callback: Option<ResultCallback>) {
        self.run_operation(
            RelayMethod::StopListening,
            WireValue::Array(Vec::new()),
            &STOP_LISTENING,
            callback,
            |_| {},
        );
    }

    /// Asks the relay to echo this client's own messages back to it. The
    /// local flag only changes once the relay accepts it.
    pub fn set_allow_self_messaging(&self, allow: bool, callback: Option<ResultCallback>) {
        self.run_operation(
            RelayMethod::SetAllowSelfMessaging,
            WireValue::Array(vec![WireValue::Bool(allow)]),
            &SET_ALLOW_SELF_MESSAGING,
            callback,
            move |session| {
                session.inner.state.lock().allow_self_messaging = allow;
            },
        );
    }

    /// Invokes a relay method. The invocation counts as pending until its
    /// callback has run, holding back any requested transport stop.
    pub fn invoke(&self, method: RelayMethod, args: WireValue, callback: InvokeCallback) {
        self.inner.state.lock().pending_invocations += 1;

        let session = self.clone();
        self.inner.transport.invoke(
            method.as_str(),
            args,
            Box::new(move |result| {
                let executor = session.inner.executor.clone();
                executor.execute(Box::new(move || {
                    callback(result);
                    session.complete_invocation();
                }));
            }),
        );
    }

    /// Sends to a relay method without expecting a response value
    pub fn send(&self, method: RelayMethod, args: WireValue, callback: SendCallback) {
        self.inner.state.lock().pending_invocations += 1;

        let session = self.clone();
        self.inner.transport.send(
            method.as_str(),
            args,
            Box::new(move |result| {
                let executor = session.inner.executor.clone();
                executor.execute(Box::new(move || {
                    callback(result);
                    session.complete_invocation();
                }));
            }),
        );
    }

    /// Registers the transport-level handler for a pushed event
    pub fn on(&self, event: PushEvent, handler: PushHandler) {
        self.inner.transport.on(event.as_str(), handler);
    }

    // Chain plumbing

    /// Invokes `method` as one step of a chain, failing fast with
    /// `NotConnected` when the session is not connected
    pub(crate) fn invoke_step(
        &self,
        method: RelayMethod,
        args: WireValue,
        messages: &'static StepMessages,
        next: Continuation<WireValue>,
    ) {
        if !self.is_connected() {
            next(Err(ChainError::not_connected(messages.not_connected)));
            return;
        }

        let failed = messages.failed;
        let log = self.inner.log.clone();
        self.invoke(
            method,
            args,
            Box::new(move |result| {
                next(result.map_err(|error| {
                    log.log(LogLevel::Verbose, &format!("{} {}", failed, error));
                    ChainError::from_transport(&error, failed)
                }))
            }),
        );
    }

    fn run_operation(
        &self,
        method: RelayMethod,
        args: WireValue,
        messages: &'static StepMessages,
        callback: Option<ResultCallback>,
        on_success: impl FnOnce(&SessionHandle) + Send + 'static,
    ) {
        let session = self.clone();
        self.invoke_step(
            method,
            args,
            messages,
            Box::new(move |result| match result {
                Ok(_) => {
                    on_success(&session);
                    respond(callback, OperationResult::success());
                }
                Err(error) => {
                    session.log(LogLevel::Error, &error.message);
                    respond(callback, OperationResult::failed(error.code));
                }
            }),
        );
    }

    fn connect_chain(&self, done: Continuation<()>) {
        let session = self.clone();
        self.start_transport(Box::new(move |started| {
            and_then(started, done, |(), done| {
                session.mark_connected();
                session.delete_entities_step(done);
            })
        }));
    }

    fn delete_entities_step(&self, done: Continuation<()>) {
        let session = self.clone();
        self.delete_entities(
            ALL_ENTITIES_ID,
            Box::new(move |deleted| {
                and_then(deleted, done, |(), done| session.request_client_id_step(done))
            }),
        );
    }

    fn request_client_id_step(&self, done: Continuation<()>) {
        let session = self.clone();
        self.request_client_id(Box::new(move |client_id| {
            and_then(client_id, done, |client_id, done| {
                session.inner.state.lock().client_id = Some(client_id);
                session.start_listening(done);
            })
        }));
    }

    fn finish_connect(&self, result: Result<(), ChainError>, callback: Option<ResultCallback>) {
        match result {
            Ok(()) => {
                self.log(LogLevel::Log, CONNECTED_MESSAGE);
                let connection_callback = self.inner.callbacks.lock().connection.clone();
                if let Some(connection_callback) = connection_callback {
                    connection_callback(CONNECTED_MESSAGE);
                }
                respond(callback, OperationResult::success());
            }
            Err(error) => {
                self.log(LogLevel::Error, &error.message);
                let code = error.code;
                self.disconnect_with_reason(
                    error.message,
                    Box::new(move |_| respond(callback, OperationResult::failed(code))),
                );
            }
        }
    }

    fn start_transport(&self, next: Continuation<()>) {
        let executor = self.inner.executor.clone();
        let log = self.inner.log.clone();
        self.inner.transport.start(
            &self.inner.config.url,
            Box::new(move |result| {
                executor.execute(Box::new(move || {
                    next(result.map_err(|error| {
                        log.log(
                            LogLevel::Verbose,
                            &format!("Transport failed to start: {}", error),
                        );
                        ChainError::from_transport(&error, START_ERROR_MESSAGE)
                    }))
                }));
            }),
        );
    }

    fn mark_connected(&self) {
        let mut state = self.inner.state.lock();
        state.connection_state = ConnectionState::Connected;
        state.transport_started = true;
    }

    /// Deletes this client's entities on the relay. `ALL_ENTITIES_ID` is sent
    /// as `null`.
    fn delete_entities(&self, entity_id: u64, next: Continuation<()>) {
        let target = if entity_id == ALL_ENTITIES_ID {
            WireValue::Null
        } else {
            WireValue::Array(vec![WireValue::UInteger(entity_id)])
        };
        self.invoke_step(
            RelayMethod::DeleteObjects,
            WireValue::Array(vec![target]),
            &DELETE_ENTITIES,
            Box::new(move |result| next(result.map(|_| ()))),
        );
    }

    fn request_client_id(&self, next: Continuation<u64>) {
        self.invoke_step(
            RelayMethod::GetClientId,
            WireValue::Array(Vec::new()),
            &REQUEST_CLIENT_ID,
            Box::new(move |result| {
                next(result.and_then(|value| {
                    value.try_as_u64().map_err(|error| {
                        ChainError::new(
                            ErrorCode::Unknown,
                            format!("{} {}", REQUEST_CLIENT_ID.failed, error),
                        )
                    })
                }))
            }),
        );
    }

    fn start_listening(&self, next: Continuation<()>) {
        self.invoke_step(
            RelayMethod::StartListening,
            WireValue::Array(Vec::new()),
            &START_LISTENING,
            Box::new(move |result| next(result.map(|_| ()))),
        );
    }

    // Teardown

    pub(crate) fn disconnect_with_reason(&self, reason: String, callback: StopCallback) {
        {
            let mut state = self.inner.state.lock();
            if state.connection_state != ConnectionState::Disconnected {
                state.connection_state = ConnectionState::Disconnecting;
            }
        }

        let session = self.clone();
        self.request_stop(Box::new(move |result| {
            let was_live = {
                let mut state = session.inner.state.lock();
                let was_live = state.connection_state != ConnectionState::Disconnected;
                state.connection_state = ConnectionState::Disconnected;
                state.client_id = None;
                was_live
            };

            callback(result);

            if was_live {
                session.notify_disconnection(&reason);
            }
        }));
    }

    /// Stops the transport, deferring until no invocation is pending. A stop
    /// requested while another is pending joins it.
    fn request_stop(&self, callback: StopCallback) {
        enum StopAction {
            NotStarted(StopCallback),
            Coalesced,
            Deferred(usize),
            Issue,
        }

        let action = {
            let mut state = self.inner.state.lock();
            if !state.transport_started {
                StopAction::NotStarted(callback)
            } else if let Some(pending_stop) = state.deferred_stop.take() {
                state.deferred_stop = Some(Box::new(move |result: Result<(), TransportError>| {
                    pending_stop(result.clone());
                    callback(result);
                }));
                StopAction::Coalesced
            } else {
                state.deferred_stop = Some(callback);
                if state.pending_invocations > 0 {
                    StopAction::Deferred(state.pending_invocations)
                } else {
                    state.stop_issued = true;
                    StopAction::Issue
                }
            }
        };

        match action {
            StopAction::NotStarted(callback) => callback(Ok(())),
            StopAction::Coalesced => {
                self.log(
                    LogLevel::Verbose,
                    "A transport stop is already pending, joining it.",
                );
            }
            StopAction::Deferred(pending) => {
                self.log(
                    LogLevel::Verbose,
                    &format!(
                        "Deferring transport stop until {} pending invocations complete.",
                        pending
                    ),
                );
            }
            StopAction::Issue => self.issue_stop(),
        }
    }

    fn issue_stop(&self) {
        let session = self.clone();
        self.inner.transport.stop(Box::new(move |result| {
            let executor = session.inner.executor.clone();
            executor.execute(Box::new(move || session.complete_stop(result)));
        }));
    }

    fn complete_stop(&self, result: Result<(), TransportError>) {
        let pending_stop = {
            let mut state = self.inner.state.lock();
            state.transport_started = false;
            state.stop_issued = false;
            state.deferred_stop.take()
        };

        if let Some(pending_stop) = pending_stop {
            pending_stop(result);
        }
    }

    fn complete_invocation(&self) {
        let issue = {
            let mut state = self.inner.state.lock();
            state.pending_invocations = state.pending_invocations.saturating_sub(1);
            if state.pending_invocations == 0
                && state.deferred_stop.is_some()
                && !state.stop_issued
            {
                state.stop_issued = true;
                true
            } else {
                false
            }
        };

        if issue {
            self.issue_stop();
        }
    }

    fn notify_disconnection(&self, reason: &str) {
        let disconnection_callback = self.inner.callbacks.lock().disconnection.clone();
        if let Some(disconnection_callback) = disconnection_callback {
            disconnection_callback(reason);
        }
    }

    // Server-driven events

    fn bind_push_handlers(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.on(
            PushEvent::OnRequestToDisconnect,
            Arc::new(move |payload| {
                if let Some(inner) = weak.upgrade() {
                    SessionHandle { inner }.on_request_to_disconnect(payload);
                }
            }),
        );

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .transport
            .set_disconnected_handler(Arc::new(move |error| {
                if let Some(inner) = weak.upgrade() {
                    SessionHandle { inner }.on_transport_closed(error);
                }
            }));
    }

    fn on_request_to_disconnect(&self, payload: WireValue) {
        let reason = payload
            .try_element(0)
            .and_then(|reason| reason.try_as_str())
            .map(str::to_string)
            .unwrap_or_else(|_| DISCONNECT_REASON_SERVER_DEFAULT.to_string());

        if self.connection_state() == ConnectionState::Disconnected {
            self.log(
                LogLevel::Verbose,
                &format!("Ignoring server disconnect request while disconnected: {}", reason),
            );
            return;
        }

        self.log(
            LogLevel::Log,
            &format!("Server requested disconnect: {}", reason),
        );
        self.disconnect_with_reason(reason, Box::new(|_| {}));
    }

    fn on_transport_closed(&self, error: Option<TransportError>) {
        let was_connected = {
            let mut state = self.inner.state.lock();
            if state.connection_state != ConnectionState::Connected {
                false
            } else {
                state.connection_state = ConnectionState::Disconnected;
                state.transport_started = false;
                state.client_id = None;
                true
            }
        };
        if !was_connected {
            return;
        }

        let message = match error {
            Some(error) => format!("{} {}", CONNECTION_INTERRUPTED, error),
            None => CONNECTION_INTERRUPTED.to_string(),
        };
        self.log(LogLevel::Error, &message);

        let interruption_callback = self.inner.callbacks.lock().network_interruption.clone();
        if let Some(interruption_callback) = interruption_callback {
            interruption_callback(&message);
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.inner.log.log(level, message);
    }
}
