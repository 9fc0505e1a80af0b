use strata_shared::PushEvent;

use crate::{connection::session_connection::SessionHandle, transport::PushHandler};

/// Where subsystems subscribe to events pushed by the relay
pub trait EventSource: Send + Sync {
    fn listen(&self, event: PushEvent, handler: PushHandler);
}

impl EventSource for SessionHandle {
    fn listen(&self, event: PushEvent, handler: PushHandler) {
        self.on(event, handler);
    }
}
