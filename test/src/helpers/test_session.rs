use std::sync::Arc;

use parking_lot::Mutex;

use strata_client::{
    shared::OperationResult, ResultCallback, SessionConfig, SessionConnection, SessionHandle,
};

use crate::{helpers::recording_log::RecordingLogSink, local_transport::LocalTransport};

pub const TEST_RELAY_URL: &str = "wss://relay.test/hub";

/// Collects what an operation reported to its callback
#[derive(Clone, Default)]
pub struct ResultSlot {
    results: Arc<Mutex<Vec<OperationResult>>>,
}

impl ResultSlot {
    /// The single reported result, `None` while the operation is outstanding
    pub fn get(&self) -> Option<OperationResult> {
        let results = self.results.lock();
        assert!(results.len() <= 1, "callback ran {} times", results.len());
        results.first().copied()
    }

    pub fn count(&self) -> usize {
        self.results.lock().len()
    }
}

/// A slot and the callback that fills it
pub fn capture_result() -> (ResultSlot, Option<ResultCallback>) {
    let slot = ResultSlot::default();
    let results = slot.results.clone();
    let callback: ResultCallback = Box::new(move |result| results.lock().push(result));
    (slot, Some(callback))
}

/// A session over a `LocalTransport`, with every log line recorded
pub struct TestSession {
    pub transport: LocalTransport,
    pub log: Arc<RecordingLogSink>,
    pub session: SessionConnection,
}

impl TestSession {
    pub fn new(transport: LocalTransport) -> Self {
        let log = Arc::new(RecordingLogSink::new());
        let session = SessionConnection::new(
            SessionConfig::new(TEST_RELAY_URL),
            Arc::new(transport.clone()),
            log.clone(),
        );
        Self {
            transport,
            log,
            session,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.session.handle()
    }

    /// Connects and asserts the connect sequence succeeded
    pub fn connect(&self) {
        let (slot, callback) = capture_result();
        self.session.connect(callback);
        let result = slot.get().expect("connect completes inline");
        assert!(result.is_success(), "connect failed: {:?}", result);
    }
}

/// A session already connected as `client_id`
pub fn connected_session(client_id: u64) -> TestSession {
    let test_session = TestSession::new(LocalTransport::new().with_client_id(client_id));
    test_session.connect();
    test_session
}
