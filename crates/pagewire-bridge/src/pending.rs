use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pagewire_frame::RemoteError;
use serde_json::Value;
use tokio::sync::oneshot;

/// Outcome delivered to a pending request.
pub type Completion = std::result::Result<Value, RemoteError>;

/// Table of in-flight requests for one side of the link.
///
/// Keys are minted strictly increasing and never reused within the map's
/// lifetime. An entry is removed exactly once — by the matching Result or
/// Error frame, or by [`drain`](Self::drain) on teardown. There is no
/// per-request cancellation: an abandoned caller leaves its entry in place,
/// and a late answer still completes it (the dropped receiver just
/// discards the value).
pub struct PendingMap {
    next_key: AtomicU64,
    entries: Mutex<HashMap<u64, oneshot::Sender<Completion>>>,
}

impl PendingMap {
    pub fn new() -> Self {
        Self {
            next_key: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a fresh correlation key.
    pub fn mint(&self) -> u64 {
        self.next_key.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a request under `key` and return the receiver its answer
    /// will arrive on.
    pub fn register(&self, key: u64) -> oneshot::Receiver<Completion> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(key, tx);
        rx
    }

    /// Deliver an answer for `key`.
    ///
    /// Returns `false` when the key is unknown or already retired; the
    /// caller decides whether that means "late answer" or "unsolicited".
    pub fn complete(&self, key: u64, outcome: Completion) -> bool {
        match self.lock().remove(&key) {
            Some(tx) => {
                // A dropped receiver means the caller abandoned the future;
                // the answer is still considered delivered.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Whether `key` is still awaiting an answer.
    pub fn is_pending(&self, key: u64) -> bool {
        self.lock().contains_key(&key)
    }

    /// Number of in-flight requests.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Outstanding receivers observe a closed channel.
    pub fn drain(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<Completion>>> {
        // A panic while holding this lock leaves only a map of senders;
        // recovering the guard is always safe.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PendingMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PendingMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingMap")
            .field("in_flight", &self.len())
            .finish()
    }
}
