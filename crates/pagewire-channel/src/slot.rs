use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::{ChannelError, Result};

/// A single mutable string-valued location shared between two sides.
///
/// This is the only capability the transport offers: write a short string
/// into the slot, or take whatever is currently there. Writes to an occupied
/// slot fail (the writer defers); reads clear the slot. A slot carries at
/// most one frame at a time, and a frame overwritten before it is read is
/// simply lost — upper layers recover through timeouts, never retries.
pub trait ChannelSlot: Send + Sync {
    /// Attempt to place `text` into the slot.
    ///
    /// Returns `Ok(false)` without writing when the slot still holds an
    /// unread value.
    fn try_write(&self, text: &str) -> Result<bool>;

    /// Take the current contents, leaving the slot empty.
    fn try_read(&self) -> Result<Option<String>>;

    /// Readiness notifier for channels that can signal writes.
    ///
    /// `None` means the channel offers no notification and must be polled.
    fn readable(&self) -> Option<Arc<Notify>> {
        None
    }
}

/// In-process slot used by tests, demos, and same-process remotes.
///
/// Plays the role a socket pair plays for stream transports: two of these,
/// crossed, form a full link (see [`SlotEndpoint`]).
///
/// [`SlotEndpoint`]: crate::endpoint::SlotEndpoint
pub struct MemorySlot {
    cell: Mutex<SlotCell>,
    notify: Arc<Notify>,
}

#[derive(Default)]
struct SlotCell {
    value: Option<String>,
    closed: bool,
}

impl MemorySlot {
    /// Create an empty, open slot.
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(SlotCell::default()),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Close the slot. Subsequent writes fail with [`ChannelError::Closed`];
    /// reads drain any unread value first.
    pub fn close(&self) {
        if let Ok(mut cell) = self.cell.lock() {
            cell.closed = true;
        }
        // Wake a receiver blocked on the notifier so it observes the close.
        self.notify.notify_one();
    }

    /// Whether the slot currently holds an unread value.
    pub fn is_occupied(&self) -> Result<bool> {
        let cell = self.cell.lock().map_err(|_| ChannelError::Poisoned)?;
        Ok(cell.value.is_some())
    }

    /// Replace the slot contents unconditionally, dropping any unread value.
    ///
    /// This is the lost-update fault the protocol must tolerate. Intended
    /// for fault-injection tests; production writers go through
    /// [`ChannelSlot::try_write`].
    pub fn clobber(&self, text: &str) -> Result<()> {
        let mut cell = self.cell.lock().map_err(|_| ChannelError::Poisoned)?;
        if cell.closed {
            return Err(ChannelError::Closed);
        }
        if cell.value.is_some() {
            tracing::trace!("clobbering unread slot value");
        }
        cell.value = Some(text.to_string());
        drop(cell);
        self.notify.notify_one();
        Ok(())
    }
}

impl Default for MemorySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSlot for MemorySlot {
    fn try_write(&self, text: &str) -> Result<bool> {
        let mut cell = self.cell.lock().map_err(|_| ChannelError::Poisoned)?;
        if cell.closed {
            return Err(ChannelError::Closed);
        }
        if cell.value.is_some() {
            return Ok(false);
        }
        cell.value = Some(text.to_string());
        drop(cell);
        self.notify.notify_one();
        Ok(true)
    }

    fn try_read(&self) -> Result<Option<String>> {
        let mut cell = self.cell.lock().map_err(|_| ChannelError::Poisoned)?;
        match cell.value.take() {
            Some(value) => Ok(Some(value)),
            None if cell.closed => Err(ChannelError::Closed),
            None => Ok(None),
        }
    }

    fn readable(&self) -> Option<Arc<Notify>> {
        Some(Arc::clone(&self.notify))
    }
}

impl std::fmt::Debug for MemorySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (occupied, closed) = match self.cell.lock() {
            Ok(cell) => (cell.value.is_some(), cell.closed),
            Err(_) => return f.write_str("MemorySlot { poisoned }"),
        };
        f.debug_struct("MemorySlot")
            .field("occupied", &occupied)
            .field("closed", &closed)
            .finish()
    }
}
