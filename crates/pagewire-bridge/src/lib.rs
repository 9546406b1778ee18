//! Host-side correlation/dispatch engine and remote runtime for pagewire.
//!
//! This is the "just works" layer. Attach a [`Bridge`] to one end of a slot
//! link and a [`RemoteService`] to the other, then evaluate expressions in
//! the remote environment, expose host functions to it, and observe its
//! console output and uncaught errors — all over a channel whose only
//! capability is a single destructively-consumed string slot per direction.
//!
//! Both sides are cooperatively scheduled: each runs one receive tick at a
//! time, every wait is a poll or an awaited oneshot, and requests are
//! matched purely by correlation key, never by arrival order.

pub mod bridge;
pub mod config;
pub mod error;
pub mod event;
pub mod pending;
pub mod poll;
pub mod remote;
pub mod script;

pub use bridge::{Bridge, NullInjector, RuntimeInjector};
pub use config::LinkConfig;
pub use error::{BridgeError, Result};
pub use event::{BridgeEvent, ConsoleMessage};
pub use pending::PendingMap;
pub use poll::{poll_until, PollConfig, TimeoutError};
pub use remote::{
    RemoteConsole, RemoteHandle, RemoteService, ScriptCall, ScriptEngine, ScriptFuture,
    ServiceHandle, ServiceInjector,
};
pub use script::{is_truthy, Script};
