use std::time::Duration;

/// Loop timing for one side of a slot link.
///
/// The same configuration shape serves both the host (Bridge) and the
/// remote (RemoteService) loops; each side gets its own copy.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// Pause between receive-loop ticks when the channel offers no
    /// readiness notification (and the fallback tick even when it does).
    pub poll_interval: Duration,
    /// Pause between attempts to write into an occupied slot.
    pub write_retry_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            write_retry_interval: Duration::from_millis(2),
        }
    }
}
