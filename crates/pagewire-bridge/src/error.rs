use pagewire_channel::ChannelError;
use pagewire_frame::{FrameError, RemoteError};

use crate::poll::TimeoutError;

/// Errors surfaced to bridge callers.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The channel slot failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Frame encoding/decoding failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The remote expression threw or its awaitable rejected.
    #[error("remote execution failed: {0}")]
    Remote(#[from] RemoteError),

    /// A poll deadline elapsed before the condition held.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Payload serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The bridge is not attached, or was detached while the request was
    /// in flight.
    #[error("bridge detached")]
    Detached,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
