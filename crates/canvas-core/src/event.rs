//! Ordered handler lists with token-based removal.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

static NEXT_REGISTRATION_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_registration_token() -> EventRegistrationToken {
    EventRegistrationToken(NEXT_REGISTRATION_TOKEN.fetch_add(1, Ordering::Relaxed))
}

/// Opaque handle returned when a handler is added; used to remove it again.
///
/// Tokens are unique across the whole process, so a token from one event can
/// never remove a handler from another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventRegistrationToken(u64);

impl EventRegistrationToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Handler list dispatched in registration order.
///
/// Adding and removing handlers is allowed while a dispatch is running,
/// including a handler removing itself from inside its own invocation.
pub struct EventSource<H: ?Sized> {
    entries: Mutex<Vec<(EventRegistrationToken, Arc<H>)>>,
}

impl<H: ?Sized> EventSource<H> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, handler: Arc<H>) -> EventRegistrationToken {
        let token = next_registration_token();
        self.entries.lock().push((token, handler));
        token
    }

    /// Removes the handler registered under `token`. Returns false for unknown tokens.
    pub fn remove(&self, token: EventRegistrationToken) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|(entry, _)| *entry == token) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, token: EventRegistrationToken) -> bool {
        self.entries.lock().iter().any(|(entry, _)| *entry == token)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Invokes every handler in registration order and stops at the first error.
    ///
    /// Dispatch walks a snapshot taken on entry. Handlers added during the
    /// dispatch wait for the next one; handlers removed during it are skipped.
    /// No lock is held while a handler runs.
    pub fn invoke_all<E>(&self, mut invoke: impl FnMut(&H) -> Result<(), E>) -> Result<(), E> {
        let snapshot: Vec<(EventRegistrationToken, Arc<H>)> = self.entries.lock().clone();
        for (token, handler) in snapshot {
            if !self.contains(token) {
                continue;
            }
            invoke(&handler)?;
        }
        Ok(())
    }
}

impl<H: ?Sized> Default for EventSource<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> fmt::Debug for EventSource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("handlers", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/event_tests.rs"]
mod tests;
