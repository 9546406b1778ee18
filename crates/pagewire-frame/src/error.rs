use pagewire_channel::ChannelError;

/// Errors that can occur during frame encoding/decoding and slot I/O.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The slot contents do not start with the `B_` frame prefix.
    #[error("frame missing 'B_' prefix")]
    MissingPrefix,

    /// The frame ends before the key or payload segment.
    #[error("truncated frame (missing key or payload segment)")]
    Truncated,

    /// The kind discriminator is not one of `R`, `E`, `M`, `C`.
    #[error("unknown frame kind {0:?}")]
    UnknownKind(String),

    /// The correlation key segment is not empty or decimal.
    #[error("invalid correlation key {0:?}")]
    InvalidKey(String),

    /// The payload segment is present but is not valid JSON.
    #[error("frame payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    /// The underlying channel slot failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
