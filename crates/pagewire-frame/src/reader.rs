use std::sync::Arc;

use pagewire_channel::ChannelSlot;
use tokio::sync::Notify;

use crate::codec::Frame;
use crate::error::Result;

/// Reads frames off a channel slot.
///
/// The slot is cleared before the frame is decoded, so it is free for the
/// next writer even when decoding fails — a malformed frame costs one tick,
/// never the channel.
#[derive(Clone)]
pub struct SlotReader {
    slot: Arc<dyn ChannelSlot>,
}

impl SlotReader {
    pub fn new(slot: Arc<dyn ChannelSlot>) -> Self {
        Self { slot }
    }

    /// Take and decode the next frame, if one is present.
    pub fn try_next(&self) -> Result<Option<Frame>> {
        match self.slot.try_read()? {
            None => Ok(None),
            Some(text) => Frame::decode(&text).map(Some),
        }
    }

    /// Readiness notifier of the underlying slot, if it has one.
    pub fn readable(&self) -> Option<Arc<Notify>> {
        self.slot.readable()
    }
}
