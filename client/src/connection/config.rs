use std::time::Duration;

/// Contains Config properties which will be used by a `SessionConnection`
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Endpoint of the relay hub the transport is started against
    pub url: String,
    /// How long dropping a connected session waits for its transport to stop
    pub shutdown_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }
}
