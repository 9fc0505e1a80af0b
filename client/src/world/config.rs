use std::time::Duration;

/// How entity changes reach the rest of the space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicationMode {
    /// Changes apply locally as soon as they are made; nothing is sent
    Offline,
    /// Changes are sent to the relay and apply locally once it acknowledges them
    Online,
}

/// Contains Config properties which will be used by the replication engine
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    /// Minimum time between two outgoing patches for the same entity
    pub entity_patch_rate: Duration,
    /// Whether `entity_patch_rate` is enforced
    pub entity_patch_rate_limit_enabled: bool,
    /// Entities requested per page when retrieving a space's existing entities
    pub entity_page_limit: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            entity_patch_rate: Duration::from_millis(90),
            entity_patch_rate_limit_enabled: true,
            entity_page_limit: 100,
        }
    }
}
