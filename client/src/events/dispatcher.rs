use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use parking_lot::Mutex;

use strata_shared::{
    ErrorCode, EventMessage, LogLevel, LogSink, OperationResult, PushEvent, RelayMethod,
    ReplicatedValue, WireValue, ALL_CLIENTS_ID,
};

use crate::{
    connection::session_connection::{respond, ResultCallback, SessionHandle, StepMessages},
    events::{
        deserialize::{decode_general_values, deserialize_event},
        error::EventError,
        event_source::EventSource,
        network_event::NetworkEvent,
    },
};

const SEND_EVENT_MESSAGE: StepMessages = StepMessages {
    not_connected: "MultiplayerConnection::SendNetworkEvent, Error not connected.",
    failed: "MultiplayerConnection::SendNetworkEvent, Error when sending event message.",
};

/// Receives `(success, arguments)` for a named event
pub type ParameterisedCallback = Arc<dyn Fn(bool, &[ReplicatedValue]) + Send + Sync>;

/// Receives the typed form of a named event
pub type NetworkEventCallback = Arc<dyn Fn(&NetworkEvent) + Send + Sync>;

/// Takes over an event entirely, reading the raw payload itself
pub trait SystemEventHandler: Send + Sync {
    fn on_event(&self, payload: &WireValue);
}

/// Identifies one receiver's interest in one event
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventRegistration {
    pub receiver_id: String,
    pub event_name: String,
}

impl EventRegistration {
    pub fn new(receiver_id: &str, event_name: &str) -> Self {
        Self {
            receiver_id: receiver_id.to_string(),
            event_name: event_name.to_string(),
        }
    }
}

#[derive(Default)]
struct EventListeners {
    callbacks: Vec<ParameterisedCallback>,
    system_handler: Option<Arc<dyn SystemEventHandler>>,
}

struct DispatcherInner {
    session: SessionHandle,
    log: Arc<dyn LogSink>,
    listeners: Mutex<HashMap<String, EventListeners>>,
    registrations: Mutex<BTreeMap<EventRegistration, NetworkEventCallback>>,
}

/// Routes `OnEventMessage` frames to the listeners registered for each event
/// name, and sends events to other clients.
///
/// A system handler registered for a name receives that event exclusively.
/// Otherwise every plain callback gets the decoded arguments and every keyed
/// registration gets the typed `NetworkEvent`.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

impl EventDispatcher {
    pub fn new(session: &SessionHandle, log: Arc<dyn LogSink>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                session: session.clone(),
                log,
                listeners: Mutex::new(HashMap::new()),
                registrations: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Subscribes to the relay's event frames
    pub fn start_event_message_listening(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.session.listen(
            PushEvent::OnEventMessage,
            Arc::new(move |payload| {
                if let Some(inner) = weak.upgrade() {
                    EventDispatcher { inner }.dispatch_event_message(&payload);
                }
            }),
        );
    }

    // Registration

    /// Adds a callback for `event_name`. Registering again adds another
    /// callback; all of them are invoked.
    pub fn listen_network_event(&self, event_name: &str, callback: ParameterisedCallback) {
        self.inner
            .listeners
            .lock()
            .entry(event_name.to_string())
            .or_default()
            .callbacks
            .push(callback);
    }

    /// Hands `event_name` to `handler` exclusively, replacing any previous
    /// system handler
    pub fn listen_network_event_for_system(
        &self,
        event_name: &str,
        handler: Arc<dyn SystemEventHandler>,
    ) {
        self.inner
            .listeners
            .lock()
            .entry(event_name.to_string())
            .or_default()
            .system_handler = Some(handler);
    }

    /// Removes every callback and the system handler for `event_name`
    pub fn stop_listen_network_event(&self, event_name: &str) {
        if self.inner.listeners.lock().remove(event_name).is_none() {
            self.log(
                LogLevel::Verbose,
                &format!("No listeners registered for event {}.", event_name),
            );
        }
    }

    /// Registers `receiver_id` for the typed form of `event_name`. A receiver
    /// can register for each event once.
    pub fn listen_network_event_as(
        &self,
        receiver_id: &str,
        event_name: &str,
        callback: NetworkEventCallback,
    ) -> Result<(), EventError> {
        let registration = EventRegistration::new(receiver_id, event_name);
        let duplicate = {
            let mut registrations = self.inner.registrations.lock();
            if registrations.contains_key(&registration) {
                true
            } else {
                registrations.insert(registration, callback);
                false
            }
        };

        if duplicate {
            self.log(
                LogLevel::Warning,
                &format!(
                    "Receiver {} is already registered for event {}.",
                    receiver_id, event_name
                ),
            );
            return Err(EventError::DuplicateRegistration {
                receiver_id: receiver_id.to_string(),
                event_name: event_name.to_string(),
            });
        }
        Ok(())
    }

    pub fn stop_listen_registration(&self, registration: &EventRegistration) -> Result<(), EventError> {
        if self.inner.registrations.lock().remove(registration).is_some() {
            return Ok(());
        }

        self.log(
            LogLevel::Verbose,
            &format!(
                "Receiver {} is not registered for event {}.",
                registration.receiver_id, registration.event_name
            ),
        );
        Err(EventError::RegistrationNotFound {
            receiver_id: registration.receiver_id.clone(),
            event_name: registration.event_name.clone(),
        })
    }

    /// Removes every registration held by `receiver_id`, returning how many
    /// there were
    pub fn stop_listen_all_network_events(&self, receiver_id: &str) -> usize {
        let removed = {
            let mut registrations = self.inner.registrations.lock();
            let before = registrations.len();
            registrations.retain(|registration, _| registration.receiver_id != receiver_id);
            before - registrations.len()
        };

        if removed == 0 {
            self.log(
                LogLevel::Verbose,
                &format!("Receiver {} had no event registrations.", receiver_id),
            );
        }
        removed
    }

    pub fn all_registrations(&self) -> Vec<EventRegistration> {
        self.inner.registrations.lock().keys().cloned().collect()
    }

    // Dispatch

    /// Routes one `OnEventMessage` payload, `[[event_type, sender, recipient, components]]`
    pub fn dispatch_event_message(&self, payload: &WireValue) {
        if payload.is_null() {
            self.log(LogLevel::Log, "Event message payload was empty, discarding.");
            return;
        }

        let frame = match payload.try_element(0) {
            Ok(frame) => frame,
            Err(error) => {
                self.log(
                    LogLevel::Error,
                    &format!("Malformed event message payload: {}", error),
                );
                return;
            }
        };
        let event_name = match frame.try_element(0).and_then(WireValue::try_as_str) {
            Ok(event_name) => event_name.to_string(),
            Err(error) => {
                self.log(
                    LogLevel::Error,
                    &format!("Event message has no event type: {}", error),
                );
                return;
            }
        };

        let (system_handler, callbacks) = {
            let listeners = self.inner.listeners.lock();
            match listeners.get(&event_name) {
                Some(listeners) => (listeners.system_handler.clone(), listeners.callbacks.clone()),
                None => (None, Vec::new()),
            }
        };

        if let Some(system_handler) = system_handler {
            system_handler.on_event(payload);
            return;
        }

        let keyed: Vec<NetworkEventCallback> = self
            .inner
            .registrations
            .lock()
            .iter()
            .filter(|(registration, _)| registration.event_name == event_name)
            .map(|(_, callback)| callback.clone())
            .collect();

        if callbacks.is_empty() && keyed.is_empty() {
            self.log(
                LogLevel::Verbose,
                &format!("Received event {} has no registrations, discarding...", event_name),
            );
            return;
        }

        let message = match EventMessage::try_from_wire(frame) {
            Ok(message) => message,
            Err(error) => {
                self.log(
                    LogLevel::Error,
                    &format!("Failed to read event {}: {}", event_name, error),
                );
                for callback in &callbacks {
                    callback(false, &[]);
                }
                return;
            }
        };

        if !callbacks.is_empty() {
            let values = decode_general_values(&message, self.inner.log.as_ref());
            for callback in &callbacks {
                callback(true, &values);
            }
        }

        if !keyed.is_empty() {
            match deserialize_event(&message, self.inner.log.as_ref()) {
                Ok(event) => {
                    for callback in &keyed {
                        callback(&event);
                    }
                }
                Err(error) => self.log(LogLevel::Error, &error.to_string()),
            }
        }
    }

    // Sending

    /// Sends an event to every client in scope
    pub fn send_network_event(
        &self,
        event_name: &str,
        args: &[ReplicatedValue],
        callback: Option<ResultCallback>,
    ) {
        self.send_network_event_to_client(event_name, args, ALL_CLIENTS_ID, callback);
    }

    /// Sends an event to one client; `ALL_CLIENTS_ID` broadcasts
    pub fn send_network_event_to_client(
        &self,
        event_name: &str,
        args: &[ReplicatedValue],
        target_client_id: u64,
        callback: Option<ResultCallback>,
    ) {
        let Some(sender_client_id) = self.inner.session.client_id() else {
            self.log(LogLevel::Error, SEND_EVENT_MESSAGE.not_connected);
            respond(callback, OperationResult::failed(ErrorCode::NotConnected));
            return;
        };

        let envelope = match EventMessage::new(event_name, sender_client_id, target_client_id, args) {
            Ok(envelope) => envelope,
            Err(error) => {
                self.log(
                    LogLevel::Error,
                    &format!("Failed to build event {}: {}", event_name, error),
                );
                respond(callback, OperationResult::failed(ErrorCode::Unknown));
                return;
            }
        };

        let log = self.inner.log.clone();
        self.inner.session.invoke_step(
            RelayMethod::SendEventMessage,
            WireValue::Array(vec![envelope.to_wire()]),
            &SEND_EVENT_MESSAGE,
            Box::new(move |result| match result {
                Ok(_) => respond(callback, OperationResult::success()),
                Err(error) => {
                    log.log(LogLevel::Error, &error.message);
                    respond(callback, OperationResult::failed(error.code));
                }
            }),
        );
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.inner.log.log(level, message);
    }
}
