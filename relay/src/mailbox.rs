//! Single-slot latest-value handoff between the producer and the broadcaster

use std::sync::{Arc, Mutex, PoisonError};

/// Holds the most recently published value and nothing else.
///
/// A write replaces whatever was there, read or not. Values are swapped in as
/// whole `Arc`s, so a reader always gets either the previous complete value or
/// the new one. The lock only guards a pointer swap or clone.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Mailbox<T> {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Publishes `value`, discarding the previous one.
    pub fn write(&self, value: T) {
        self.write_shared(Arc::new(value));
    }

    /// Publishes a value that is already shared.
    pub fn write_shared(&self, value: Arc<T>) {
        let previous = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.replace(value)
        };
        // Drop the superseded value outside the lock.
        drop(previous);
    }

    /// Returns the current value without consuming it, or `None` before the first write.
    pub fn read(&self) -> Option<Arc<T>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
