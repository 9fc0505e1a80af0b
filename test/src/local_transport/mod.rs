/// In-memory transport for integration testing
/// Answers relay invocations locally and lets tests push events and drops

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use strata_client::transport::{
    ConnectionState, DisconnectedHandler, InvokeCallback, PushHandler, RpcTransport,
    SendCallback, StartCallback, StopCallback, TransportError,
};
use strata_client::shared::{PushEvent, RelayMethod, WireValue};

/// First id handed out by `GenerateObjectIds`
pub const FIRST_GENERATED_ID: u64 = 1000;

/// One invocation or send the client made
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub args: WireValue,
}

struct HeldInvocation {
    method: String,
    callback: InvokeCallback,
    response: Result<WireValue, TransportError>,
}

struct TransportState {
    connection_state: ConnectionState,
    client_id: u64,
    start_failure: Option<TransportError>,
    scripted: HashMap<String, VecDeque<Result<WireValue, TransportError>>>,
    held_methods: HashSet<String>,
    held: VecDeque<HeldInvocation>,
    next_object_id: u64,
    calls: Vec<RecordedCall>,
    events: Vec<String>,
    handlers: HashMap<String, PushHandler>,
    disconnected_handler: Option<DisconnectedHandler>,
    stop_calls: usize,
}

/// Transport that answers every relay method in-process.
///
/// By default `GetClientId` returns the configured client id,
/// `GenerateObjectIds` counts up from `FIRST_GENERATED_ID`,
/// `PageScopedObjects` returns an empty page and every other method returns
/// `null`. Responses can be scripted per method, and
/// invocations of a held method wait until `release_held` is called.
#[derive(Clone)]
pub struct LocalTransport {
    state: Arc<Mutex<TransportState>>,
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState {
                connection_state: ConnectionState::Disconnected,
                client_id: 1,
                start_failure: None,
                scripted: HashMap::new(),
                held_methods: HashSet::new(),
                held: VecDeque::new(),
                next_object_id: FIRST_GENERATED_ID,
                calls: Vec::new(),
                events: Vec::new(),
                handlers: HashMap::new(),
                disconnected_handler: None,
                stop_calls: 0,
            })),
        }
    }

    pub fn with_client_id(self, client_id: u64) -> Self {
        self.state.lock().client_id = client_id;
        self
    }

    /// Makes every `start` fail with `message`
    pub fn fail_start(&self, message: &str) {
        self.state.lock().start_failure = Some(TransportError::remote(message));
    }

    /// Queues a one-shot response for the next invocation of `method`
    pub fn respond_with(&self, method: RelayMethod, response: Result<WireValue, TransportError>) {
        self.state
            .lock()
            .scripted
            .entry(method.as_str().to_string())
            .or_default()
            .push_back(response);
    }

    pub fn fail_next(&self, method: RelayMethod, message: &str) {
        self.respond_with(method, Err(TransportError::remote(message)));
    }

    /// Invocations of `method` wait for `release_held`
    pub fn hold(&self, method: RelayMethod) {
        self.state
            .lock()
            .held_methods
            .insert(method.as_str().to_string());
    }

    /// Completes every held invocation, oldest first, and stops holding
    pub fn release_held(&self) -> usize {
        let held: Vec<HeldInvocation> = {
            let mut state = self.state.lock();
            state.held_methods.clear();
            state.held.drain(..).collect()
        };

        let released = held.len();
        for invocation in held {
            self.record_event(format!("response:{}", invocation.method));
            (invocation.callback)(invocation.response);
        }
        released
    }

    pub fn held_count(&self) -> usize {
        self.state.lock().held.len()
    }

    // Server side

    /// Delivers a pushed event to the handler the client registered
    pub fn push(&self, event: PushEvent, payload: WireValue) {
        let handler = self.state.lock().handlers.get(event.as_str()).cloned();
        if let Some(handler) = handler {
            handler(payload);
        }
    }

    pub fn has_handler(&self, event: PushEvent) -> bool {
        self.state.lock().handlers.contains_key(event.as_str())
    }

    /// Closes the connection as if the network dropped
    pub fn simulate_drop(&self, error: Option<TransportError>) {
        let handler = {
            let mut state = self.state.lock();
            state.connection_state = ConnectionState::Disconnected;
            state.disconnected_handler.clone()
        };
        if let Some(handler) = handler {
            handler(error);
        }
    }

    // Inspection

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Arguments of every call made to `method`, in order
    pub fn calls_to(&self, method: RelayMethod) -> Vec<WireValue> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.method == method.as_str())
            .map(|call| call.args.clone())
            .collect()
    }

    /// Ordered log of `start`, `invoke:<method>`, `response:<method>` and `stop`
    pub fn events(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    pub fn stop_calls(&self) -> usize {
        self.state.lock().stop_calls
    }

    fn record_event(&self, event: String) {
        self.state.lock().events.push(event);
    }

    fn default_response(state: &mut TransportState, method: &str, args: &WireValue) -> WireValue {
        if method == RelayMethod::GetClientId.as_str() {
            return WireValue::UInteger(state.client_id);
        }
        if method == RelayMethod::GenerateObjectIds.as_str() {
            let count = args
                .try_element(0)
                .and_then(WireValue::try_as_u64)
                .unwrap_or(1);
            let ids = (0..count)
                .map(|offset| WireValue::UInteger(state.next_object_id + offset))
                .collect();
            state.next_object_id += count;
            return WireValue::Array(ids);
        }
        if method == RelayMethod::PageScopedObjects.as_str() {
            return WireValue::Array(vec![WireValue::Array(Vec::new()), WireValue::UInteger(0)]);
        }
        WireValue::Null
    }
}

impl RpcTransport for LocalTransport {
    fn start(&self, _url: &str, callback: StartCallback) {
        let result = {
            let mut state = self.state.lock();
            state.events.push("start".to_string());
            match state.start_failure.clone() {
                Some(error) => Err(error),
                None => {
                    state.connection_state = ConnectionState::Connected;
                    Ok(())
                }
            }
        };
        callback(result);
    }

    fn stop(&self, callback: StopCallback) {
        {
            let mut state = self.state.lock();
            state.events.push("stop".to_string());
            state.stop_calls += 1;
            state.connection_state = ConnectionState::Disconnected;
        }
        callback(Ok(()));
    }

    fn invoke(&self, method: &str, args: WireValue, callback: InvokeCallback) {
        let immediate = {
            let mut state = self.state.lock();
            state.events.push(format!("invoke:{}", method));
            state.calls.push(RecordedCall {
                method: method.to_string(),
                args: args.clone(),
            });

            let response = if state.connection_state != ConnectionState::Connected {
                Err(TransportError::NotConnected)
            } else {
                match state.scripted.get_mut(method).and_then(VecDeque::pop_front) {
                    Some(response) => response,
                    None => Ok(Self::default_response(&mut state, method, &args)),
                }
            };

            if state.held_methods.contains(method) {
                state.held.push_back(HeldInvocation {
                    method: method.to_string(),
                    callback,
                    response,
                });
                None
            } else {
                Some((callback, response))
            }
        };

        if let Some((callback, response)) = immediate {
            self.record_event(format!("response:{}", method));
            callback(response);
        }
    }

    fn send(&self, method: &str, args: WireValue, callback: SendCallback) {
        {
            let mut state = self.state.lock();
            state.events.push(format!("send:{}", method));
            state.calls.push(RecordedCall {
                method: method.to_string(),
                args,
            });
        }
        callback(Ok(()));
    }

    fn on(&self, event_name: &str, handler: PushHandler) {
        self.state
            .lock()
            .handlers
            .insert(event_name.to_string(), handler);
    }

    fn set_disconnected_handler(&self, handler: DisconnectedHandler) {
        self.state.lock().disconnected_handler = Some(handler);
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection_state
    }
}
