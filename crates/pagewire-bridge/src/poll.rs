use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Timing for a [`poll_until`] wait.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Pause between condition checks.
    pub interval: Duration,
    /// Overall deadline. [`Duration::ZERO`] disables it — the poll runs
    /// until the condition holds.
    pub timeout: Duration,
}

impl PollConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default interval with an explicit deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            timeout,
        }
    }

    /// Poll forever (until the condition holds).
    pub fn no_timeout() -> Self {
        Self::with_timeout(Duration::ZERO)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }
}

/// A poll deadline elapsed before the condition held.
///
/// Deliberately distinct from execution errors so callers can tell "it
/// failed" from "it never answered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Resolve when `check` produces a value, or fail once the deadline passes.
///
/// `check` runs immediately, then once per interval. Dropping the returned
/// future stops all further checks; nothing keeps polling in the
/// background. This is the single wait primitive of the crate — channel
/// receipt, remote readiness, and caller-side deadlines all layer on it.
pub async fn poll_until<T, F, Fut>(config: PollConfig, mut check: F) -> Result<T, TimeoutError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = (config.timeout != Duration::ZERO).then(|| Instant::now() + config.timeout);

    loop {
        // The deadline races the check itself: a check that never
        // resolves (a lost frame, an unresponsive remote) must not pin
        // the loop past its timeout.
        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, check()).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(TimeoutError(config.timeout)),
            },
            None => check().await,
        };
        if let Some(value) = outcome {
            return Ok(value);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(TimeoutError(config.timeout));
            }
        }
        tokio::time::sleep(config.interval).await;
    }
}

/// One receive-loop pause: wake on the channel's readiness signal when it
/// has one, and on the interval tick regardless.
pub(crate) async fn tick_delay(readable: &Option<Arc<Notify>>, interval: Duration) {
    match readable {
        Some(notify) => {
            tokio::select! {
                _ = notify.notified() => {}
                _ = tokio::time::sleep(interval) => {}
            }
        }
        None => tokio::time::sleep(interval).await,
    }
}
