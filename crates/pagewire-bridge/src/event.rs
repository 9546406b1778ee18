use pagewire_frame::{ConsoleKind, RemoteError};
use serde_json::Value;

/// One intercepted console call from the remote environment.
///
/// Emitted once per call, arguments in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleMessage {
    pub kind: ConsoleKind,
    pub args: Vec<Value>,
}

/// Out-of-band notifications surfaced by the bridge.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// Console output from the remote environment.
    Console(ConsoleMessage),
    /// A remote error with no waiting caller to reject (uncaught error, or
    /// an answer whose request nobody holds).
    PageError(RemoteError),
}
