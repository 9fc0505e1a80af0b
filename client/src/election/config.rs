use std::time::Duration;

/// Contains Config properties which will be used by scope leader election
#[derive(Clone, Debug)]
pub struct ElectionConfig {
    /// How often the leader of a scope tells the relay it is still there
    pub heartbeat_interval: Duration,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(3),
        }
    }
}
