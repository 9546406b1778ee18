use serde_json::Value;

use crate::descriptor::ErrorDescriptor;
use crate::error::{FrameError, Result};
use crate::payload::MessagePayload;

/// Fixed frame prefix. Anything in the slot that does not start with this
/// is not a frame.
pub const PREFIX: &str = "B_";

/// Frame discriminator, one case-sensitive character on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Successful answer to a `Call`.
    Result,
    /// Failed answer to a `Call`, or an unsolicited remote error.
    Error,
    /// Out-of-band notification (console output and reserved subtypes).
    Message,
    /// Request to execute something on the receiving side.
    Call,
}

impl FrameKind {
    /// The wire character for this kind.
    pub fn tag(self) -> char {
        match self {
            FrameKind::Result => 'R',
            FrameKind::Error => 'E',
            FrameKind::Message => 'M',
            FrameKind::Call => 'C',
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "R" => Some(FrameKind::Result),
            "E" => Some(FrameKind::Error),
            "M" => Some(FrameKind::Message),
            "C" => Some(FrameKind::Call),
            _ => None,
        }
    }
}

/// One discrete message written to the channel slot.
///
/// `key` correlates a frame with a pending request; unsolicited frames
/// (uncaught errors, console messages) carry no key. `payload` is absent
/// when the answer is literally nothing (`undefined` in the original wire).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,
    pub key: Option<u64>,
    pub payload: Option<Value>,
}

impl Frame {
    /// A successful answer keyed to a request.
    pub fn result(key: u64, payload: Value) -> Self {
        Self {
            kind: FrameKind::Result,
            key: Some(key),
            payload: Some(payload),
        }
    }

    /// A failed answer, or an unsolicited error when `key` is `None`.
    pub fn error(key: Option<u64>, descriptor: &ErrorDescriptor) -> Self {
        Self {
            kind: FrameKind::Error,
            key,
            payload: Some(descriptor.into()),
        }
    }

    /// An out-of-band message. Never keyed.
    pub fn message(payload: MessagePayload) -> Self {
        Self {
            kind: FrameKind::Message,
            key: None,
            payload: Some(payload.into()),
        }
    }

    /// A request to execute something on the other side.
    pub fn call(key: u64, payload: Value) -> Self {
        Self {
            kind: FrameKind::Call,
            key: Some(key),
            payload: Some(payload),
        }
    }

    /// Serialize into the textual wire form.
    pub fn encode(&self) -> Result<String> {
        let key = match self.key {
            Some(key) => key.to_string(),
            None => String::new(),
        };
        let payload = match &self.payload {
            Some(payload) => serde_json::to_string(payload)?,
            None => String::new(),
        };
        Ok(format!("{PREFIX}{}_{key}_{payload}", self.kind.tag()))
    }

    /// Parse slot contents back into a frame.
    pub fn decode(text: &str) -> Result<Self> {
        let rest = text.strip_prefix(PREFIX).ok_or(FrameError::MissingPrefix)?;
        let mut segments = rest.splitn(3, '_');

        let kind = segments.next().unwrap_or_default();
        let kind =
            FrameKind::from_tag(kind).ok_or_else(|| FrameError::UnknownKind(kind.to_string()))?;

        let key = segments.next().ok_or(FrameError::Truncated)?;
        let key = if key.is_empty() {
            None
        } else {
            Some(
                key.parse::<u64>()
                    .map_err(|_| FrameError::InvalidKey(key.to_string()))?,
            )
        };

        // The payload runs to the end of the slot; it may itself contain
        // underscores, hence `splitn`.
        let payload = segments.next().ok_or(FrameError::Truncated)?;
        let payload = if payload.is_empty() {
            None
        } else {
            Some(serde_json::from_str(payload)?)
        };

        Ok(Self { kind, key, payload })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encode_decode_result_roundtrip() {
        let frame = Frame::result(42, json!({"answer": [1, 2, 3]}));
        let wire = frame.encode().unwrap();
        assert!(wire.starts_with("B_R_42_"));
        assert_eq!(Frame::decode(&wire).unwrap(), frame);
    }

    #[test]
    fn encode_decode_call_roundtrip() {
        let frame = Frame::call(7, json!({"source": "2 + 2", "args": []}));
        assert_eq!(Frame::decode(&frame.encode().unwrap()).unwrap(), frame);
    }

    #[test]
    fn unsolicited_error_has_empty_key_segment() {
        let descriptor = ErrorDescriptor::new("Error", "boom");
        let frame = Frame::error(None, &descriptor);
        let wire = frame.encode().unwrap();
        assert!(wire.starts_with("B_E__"));

        let decoded = Frame::decode(&wire).unwrap();
        assert_eq!(decoded.kind, FrameKind::Error);
        assert_eq!(decoded.key, None);
    }

    #[test]
    fn payload_may_contain_underscores() {
        let frame = Frame::result(1, json!("snake_case_value"));
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded.payload, Some(json!("snake_case_value")));
    }

    #[test]
    fn absent_payload_encodes_as_empty_segment() {
        let frame = Frame {
            kind: FrameKind::Result,
            key: Some(9),
            payload: None,
        };
        assert_eq!(frame.encode().unwrap(), "B_R_9_");
        assert_eq!(Frame::decode("B_R_9_").unwrap().payload, None);
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            Frame::decode("R_1_{}"),
            Err(FrameError::MissingPrefix)
        ));
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(matches!(
            Frame::decode("B_X_1_{}"),
            Err(FrameError::UnknownKind(_))
        ));
    }

    #[test]
    fn rejects_non_decimal_key() {
        assert!(matches!(
            Frame::decode("B_R_abc_{}"),
            Err(FrameError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_truncated_frame() {
        assert!(matches!(Frame::decode("B_R"), Err(FrameError::Truncated)));
        assert!(matches!(Frame::decode("B_R_1"), Err(FrameError::Truncated)));
    }

    #[test]
    fn rejects_malformed_json_payload() {
        assert!(matches!(
            Frame::decode("B_R_1_{not json"),
            Err(FrameError::Payload(_))
        ));
    }
}
