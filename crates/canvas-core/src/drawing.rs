//! Event arguments handed to CreatingResources and Drawing handlers.

use std::cell::{RefCell, RefMut};
use std::fmt;

use crate::adapter::DrawingSession;
use crate::error::{CanvasError, Result};

/// Why a CreatingResources event was raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateResourcesReason {
    /// The control created its first device.
    FirstTime,
    /// The previous device was lost and a replacement was created.
    NewDevice,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatingResourcesEventArgs {
    pub reason: CreateResourcesReason,
}

/// Arguments of one Drawing dispatch. Owns the frame's drawing session.
///
/// The session is closed exactly once: by [`CanvasDrawingEventArgs::close`],
/// or when the args are dropped, whichever comes first. Reading the session
/// any number of times does not affect that.
pub struct CanvasDrawingEventArgs<S: DrawingSession> {
    session: RefCell<Option<S>>,
}

impl<S: DrawingSession> CanvasDrawingEventArgs<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: RefCell::new(Some(session)),
        }
    }

    /// Borrows the drawing session for issuing commands.
    ///
    /// Fails if the session has been closed or is already borrowed.
    pub fn drawing_session(&self) -> Result<RefMut<'_, S>> {
        let guard = self.session.try_borrow_mut().map_err(|_| {
            CanvasError::DrawingSession("drawing session is already borrowed".into())
        })?;
        RefMut::filter_map(guard, Option::as_mut)
            .map_err(|_| CanvasError::DrawingSession("drawing session is closed".into()))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.session.try_borrow(), Ok(session) if session.is_none())
    }

    /// Closes the session now. Later calls are no-ops.
    pub fn close(&self) -> Result<()> {
        let session = self
            .session
            .try_borrow_mut()
            .map_err(|_| CanvasError::DrawingSession("cannot close a borrowed session".into()))?
            .take();
        match session {
            Some(mut session) => session.close(),
            None => Ok(()),
        }
    }
}

impl<S: DrawingSession> Drop for CanvasDrawingEventArgs<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.get_mut().take() {
            if let Err(err) = session.close() {
                log::warn!("closing drawing session on drop failed: {err}");
            }
        }
    }
}

impl<S: DrawingSession> fmt::Debug for CanvasDrawingEventArgs<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasDrawingEventArgs")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/drawing_tests.rs"]
mod tests;
