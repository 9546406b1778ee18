/// Errors that can occur on a channel slot.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The slot has been closed and will never carry another frame.
    #[error("channel slot closed")]
    Closed,

    /// The slot's interior lock was poisoned by a panicking writer.
    #[error("channel slot lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
