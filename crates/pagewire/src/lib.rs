//! Drive a remote script environment over a single polled string slot.
//!
//! pagewire turns a channel with exactly one capability — writing a short
//! string into a slot the other side polls and destructively consumes —
//! into reliable request/response and fire-and-forget messaging between a
//! host controller and a remote script runtime.
//!
//! # Crate Structure
//!
//! - [`channel`] — the single-slot channel abstraction
//! - [`frame`] — textual wire framing, payloads, error descriptors
//! - [`bridge`] — the host-side Bridge, the remote-side RemoteService,
//!   and the `poll_until` wait primitive underneath both

/// Re-export channel types.
pub mod channel {
    pub use pagewire_channel::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pagewire_frame::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use pagewire_bridge::*;
}
