//! Wire framing for the pagewire slot protocol.
//!
//! This is the core value-add layer of pagewire. Every message written into
//! the channel slot is one textual frame:
//!
//! ```text
//! B_<kind>_<key>_<payload>
//! ```
//!
//! - `B_` — fixed prefix for slot-content recognition
//! - `kind` — one case-sensitive character: `R`esult, `E`rror, `M`essage, `C`all
//! - `key` — decimal correlation key, empty for unsolicited frames
//! - `payload` — JSON, or empty when absent
//!
//! A frame fully occupies the slot. Delivery is not guaranteed: a frame
//! written over an unread one is lost, and the only recovery is the caller's
//! timeout.

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod payload;
pub mod reader;
pub mod writer;

pub use codec::{Frame, FrameKind, PREFIX};
pub use descriptor::{ErrorDescriptor, RemoteError, RemoteErrorKind};
pub use error::{FrameError, Result};
pub use payload::{
    CallMode, CallPayload, ConsoleKind, InvokePayload, MessagePayload, MESSAGE_SOURCE_CONSOLE,
};
pub use reader::SlotReader;
pub use writer::SlotWriter;
