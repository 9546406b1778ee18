//! Single-slot channel abstraction for pagewire.
//!
//! The entire transport between the host and the remote environment is one
//! mutable string-valued location per direction: written by one side, polled
//! and destructively consumed by the other. There is no queue, no delivery
//! guarantee, and no backpressure signal — everything above this crate is
//! built to tolerate that.

pub mod endpoint;
pub mod error;
pub mod slot;

pub use endpoint::SlotEndpoint;
pub use error::{ChannelError, Result};
pub use slot::{ChannelSlot, MemorySlot};
