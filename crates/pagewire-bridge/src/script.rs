use pagewire_frame::{CallMode, CallPayload};
use serde_json::Value;

/// Remote-executable source, produced by the host-owned converter.
///
/// The converter is a capability boundary: callers hand over either source
/// text that is already valid in the remote runtime, or the source text of
/// a function to be applied to JSON-serialized arguments. The bridge never
/// introspects the text; downgrading syntax the remote runtime cannot
/// parse is the caller's responsibility before construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    source: String,
    mode: CallMode,
}

impl Script {
    /// Source text evaluated as a standalone expression.
    pub fn expression(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mode: CallMode::Expression,
        }
    }

    /// Function source applied to the call's arguments.
    pub fn function(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mode: CallMode::Function,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn mode(&self) -> CallMode {
        self.mode
    }

    /// Pair the script with its arguments into a `Call` frame body.
    pub fn into_call(self, args: Vec<Value>) -> CallPayload {
        CallPayload {
            source: self.source,
            mode: self.mode,
            args,
        }
    }
}

/// Truthiness of a JSON value, for condition waits.
///
/// `null`, `false`, numeric zero, and the empty string are falsy; every
/// array and object is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
