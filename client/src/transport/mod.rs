mod error;

pub use error::TransportError;
pub use inner::{
    ConnectionState, DisconnectedHandler, InvokeCallback, PushHandler, RpcTransport,
    SendCallback, StartCallback, StopCallback,
};

mod inner {

    use std::sync::Arc;

    use strata_shared::WireValue;

    use super::TransportError;

    /// Lifecycle state of a connection, shared by transports and the session
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum ConnectionState {
        Connecting,
        Connected,
        Disconnecting,
        #[default]
        Disconnected,
    }

    pub type StartCallback = Box<dyn FnOnce(Result<(), TransportError>) + Send>;
    pub type StopCallback = Box<dyn FnOnce(Result<(), TransportError>) + Send>;
    pub type SendCallback = Box<dyn FnOnce(Result<(), TransportError>) + Send>;
    pub type InvokeCallback = Box<dyn FnOnce(Result<WireValue, TransportError>) + Send>;

    /// Receives the argument array of a server-pushed event
    pub type PushHandler = Arc<dyn Fn(WireValue) + Send + Sync>;

    /// Notified when the transport closes without being asked to
    pub type DisconnectedHandler = Arc<dyn Fn(Option<TransportError>) + Send + Sync>;

    /// Bidirectional RPC and push-event channel to the relay.
    ///
    /// Every callback is invoked exactly once. Implementations may complete
    /// invocations in any order and on any thread.
    pub trait RpcTransport: Send + Sync {
        fn start(&self, url: &str, callback: StartCallback);

        fn stop(&self, callback: StopCallback);

        /// Request/response call of a named relay method
        fn invoke(&self, method: &str, args: WireValue, callback: InvokeCallback);

        /// Fire-and-forget call of a named relay method
        fn send(&self, method: &str, args: WireValue, callback: SendCallback);

        /// Registers the handler for a pushed event, replacing any previous one
        fn on(&self, event_name: &str, handler: PushHandler);

        fn set_disconnected_handler(&self, handler: DisconnectedHandler);

        fn connection_state(&self) -> ConnectionState;
    }
}
