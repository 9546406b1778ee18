use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Wire representation of a thrown remote error.
///
/// Error-like values are flattened to this shape before serialization; the
/// receiving side reconstructs a [`RemoteError`] from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl ErrorDescriptor {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            code: None,
        }
    }

    /// Shorthand for the descriptor produced when a call target is not a
    /// function (unknown exposed name, undefined stub).
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    /// Rebuild a typed error from the wire shape.
    pub fn reconstruct(self) -> RemoteError {
        RemoteError {
            kind: RemoteErrorKind::from_name(&self.name),
            name: self.name,
            message: self.message,
            stack: self.stack,
            code: self.code,
        }
    }
}

impl From<&ErrorDescriptor> for Value {
    fn from(descriptor: &ErrorDescriptor) -> Self {
        let mut value = json!({
            "name": descriptor.name,
            "message": descriptor.message,
        });
        if let Value::Object(map) = &mut value {
            if let Some(stack) = &descriptor.stack {
                map.insert("stack".to_string(), json!(stack));
            }
            if let Some(code) = descriptor.code {
                map.insert("code".to_string(), json!(code));
            }
        }
        value
    }
}

/// Closed registry of error kinds the bridge knows how to reconstruct.
///
/// Names outside the registry fall back to [`RemoteErrorKind::Generic`]
/// with the original name preserved on the error itself; there is no
/// open-ended namespace lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
    EvalError,
    /// An error kind the local registry does not recognize.
    Generic,
}

impl RemoteErrorKind {
    /// Look a wire name up in the registry.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Error" => RemoteErrorKind::Error,
            "TypeError" => RemoteErrorKind::TypeError,
            "RangeError" => RemoteErrorKind::RangeError,
            "ReferenceError" => RemoteErrorKind::ReferenceError,
            "SyntaxError" => RemoteErrorKind::SyntaxError,
            "EvalError" => RemoteErrorKind::EvalError,
            _ => RemoteErrorKind::Generic,
        }
    }
}

/// A remote execution error reconstructed on the receiving side.
///
/// `name` always carries the wire name, including for `Generic` kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub code: Option<i32>,
}

impl RemoteError {
    /// A locally minted error carrying no remote metadata.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorDescriptor::new(name, message).reconstruct()
    }

    /// Flatten back to the wire shape.
    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            name: self.name.clone(),
            message: self.message.clone(),
            stack: self.stack.clone(),
            code: self.code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_map_to_their_kinds() {
        for (name, kind) in [
            ("Error", RemoteErrorKind::Error),
            ("TypeError", RemoteErrorKind::TypeError),
            ("RangeError", RemoteErrorKind::RangeError),
            ("ReferenceError", RemoteErrorKind::ReferenceError),
            ("SyntaxError", RemoteErrorKind::SyntaxError),
            ("EvalError", RemoteErrorKind::EvalError),
        ] {
            assert_eq!(RemoteErrorKind::from_name(name), kind);
        }
    }

    #[test]
    fn unknown_name_falls_back_to_generic_preserving_name() {
        let error = ErrorDescriptor::new("ScriptTimeoutError", "too slow").reconstruct();
        assert_eq!(error.kind, RemoteErrorKind::Generic);
        assert_eq!(error.name, "ScriptTimeoutError");
        assert_eq!(error.to_string(), "ScriptTimeoutError: too slow");
    }

    #[test]
    fn descriptor_roundtrips_through_wire_value() {
        let descriptor = ErrorDescriptor {
            name: "TypeError".to_string(),
            message: "x".to_string(),
            stack: Some("at <anonymous>:1:1".to_string()),
            code: Some(0x1391),
        };
        let value: Value = (&descriptor).into();
        let back: ErrorDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn optional_fields_stay_off_the_wire() {
        let value: Value = (&ErrorDescriptor::new("Error", "boom")).into();
        assert!(value.get("stack").is_none());
        assert!(value.get("code").is_none());
    }

    #[test]
    fn reconstruct_then_flatten_is_lossless() {
        let descriptor = ErrorDescriptor {
            name: "RangeError".to_string(),
            message: "out of bounds".to_string(),
            stack: None,
            code: Some(7),
        };
        assert_eq!(descriptor.clone().reconstruct().descriptor(), descriptor);
    }
}
