use std::time::{Duration, SystemTime};

/// Wall-clock time since the UNIX epoch. A system clock set before the epoch
/// reads as the epoch itself.
pub(crate) fn now_since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}
