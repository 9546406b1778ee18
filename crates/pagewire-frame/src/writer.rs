use std::sync::Arc;
use std::time::Duration;

use pagewire_channel::ChannelSlot;

use crate::codec::Frame;
use crate::error::Result;

/// Default pause between attempts to write into an occupied slot.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(2);

/// Writes frames onto a channel slot.
///
/// A frame is written only when the slot is empty; while it is occupied the
/// write is deferred and retried. This reduces — but cannot eliminate — the
/// lost-update risk inherent to the single-slot channel: the slot has no
/// lock, only this cooperative discipline.
#[derive(Clone)]
pub struct SlotWriter {
    slot: Arc<dyn ChannelSlot>,
    retry_interval: Duration,
}

impl SlotWriter {
    pub fn new(slot: Arc<dyn ChannelSlot>) -> Self {
        Self::with_retry_interval(slot, DEFAULT_RETRY_INTERVAL)
    }

    pub fn with_retry_interval(slot: Arc<dyn ChannelSlot>, retry_interval: Duration) -> Self {
        Self {
            slot,
            retry_interval,
        }
    }

    /// Encode `frame` and write it once the slot frees.
    ///
    /// Returns only after the frame landed in the slot or the channel
    /// failed; there is no write deadline. A reader that never drains the
    /// slot stalls the writer, not the whole scheduler.
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        let text = frame.encode()?;
        let mut deferred = false;
        loop {
            if self.slot.try_write(&text)? {
                return Ok(());
            }
            if !deferred {
                tracing::trace!(kind = ?frame.kind, "slot occupied, deferring write");
                deferred = true;
            }
            tokio::time::sleep(self.retry_interval).await;
        }
    }
}
