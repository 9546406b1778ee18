use std::sync::Arc;

use crate::slot::{ChannelSlot, MemorySlot};

/// One side's view of a slot link: a slot it reads from and a slot it
/// writes to.
///
/// The two sides of a link hold the same pair of slots crossed, the same
/// way each end of a stream transport holds its own handle to a shared
/// connection.
#[derive(Clone)]
pub struct SlotEndpoint {
    rx: Arc<dyn ChannelSlot>,
    tx: Arc<dyn ChannelSlot>,
}

impl SlotEndpoint {
    /// Build an endpoint from an inbound and an outbound slot.
    pub fn new(rx: Arc<dyn ChannelSlot>, tx: Arc<dyn ChannelSlot>) -> Self {
        Self { rx, tx }
    }

    /// The slot this side reads from.
    pub fn receiver(&self) -> &Arc<dyn ChannelSlot> {
        &self.rx
    }

    /// The slot this side writes to.
    pub fn sender(&self) -> &Arc<dyn ChannelSlot> {
        &self.tx
    }
}

impl std::fmt::Debug for SlotEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SlotEndpoint")
    }
}

impl MemorySlot {
    /// Create a connected pair of in-process endpoints.
    ///
    /// The first endpoint is conventionally the host side, the second the
    /// remote side; each one's outbound slot is the other's inbound slot.
    pub fn pair() -> (SlotEndpoint, SlotEndpoint) {
        let a: Arc<dyn ChannelSlot> = Arc::new(MemorySlot::new());
        let b: Arc<dyn ChannelSlot> = Arc::new(MemorySlot::new());
        (
            SlotEndpoint::new(Arc::clone(&b), Arc::clone(&a)),
            SlotEndpoint::new(a, b),
        )
    }
}
