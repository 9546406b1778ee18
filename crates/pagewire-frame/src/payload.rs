use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `Message` frame source tag for intercepted console output.
pub const MESSAGE_SOURCE_CONSOLE: &str = "console";

/// How the remote engine should treat the source text of a `Call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Evaluate the source as a standalone expression; `args` are unused.
    Expression,
    /// Apply the source as a function to `args`.
    Function,
}

/// Host → remote `Call` frame body: execute this source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPayload {
    pub source: String,
    pub mode: CallMode,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Remote → host `Call` frame body: invoke this exposed function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokePayload {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Console method that produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    Log,
    Info,
    Warn,
    Error,
    Dir,
}

impl ConsoleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleKind::Log => "log",
            ConsoleKind::Info => "info",
            ConsoleKind::Warn => "warn",
            ConsoleKind::Error => "error",
            ConsoleKind::Dir => "dir",
        }
    }
}

/// `Message` frame body.
///
/// Only `source: "console"` is dispatched today; other sources are reserved
/// for future out-of-band notifications and are ignored by receivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub source: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConsoleKind>,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl MessagePayload {
    /// A console-output message.
    pub fn console(kind: ConsoleKind, data: Vec<Value>) -> Self {
        Self {
            source: MESSAGE_SOURCE_CONSOLE.to_string(),
            kind: Some(kind),
            data,
        }
    }
}

impl From<MessagePayload> for Value {
    fn from(payload: MessagePayload) -> Self {
        let mut value = json!({
            "source": payload.source,
            "data": payload.data,
        });
        if let (Some(kind), Value::Object(map)) = (payload.kind, &mut value) {
            map.insert("type".to_string(), json!(kind.as_str()));
        }
        value
    }
}
