//! Platform abstraction for the per-frame rendering tick.
//!
//! The host compositor pumps a rendering callback once per frame. Adapters
//! delegate registration to a [`FrameScheduler`] so the control can be driven
//! by a real frame loop or by a test scheduler that ticks on demand.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Callback invoked once per frame with the frame time in nanoseconds.
pub type RenderingCallback = Arc<dyn Fn(u64) -> Result<()> + Send + Sync + 'static>;

/// Opaque token identifying a registered rendering callback.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderingCallbackToken(pub u64);

impl fmt::Debug for RenderingCallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderingCallbackToken({})", self.0)
    }
}

/// Registers and unregisters per-frame rendering callbacks.
///
/// Implementations must be safe to use from multiple threads. Callbacks are
/// invoked on the thread that drives frames.
pub trait FrameScheduler: Send + Sync {
    /// Registers `callback` to run on every frame until unregistered.
    fn register(&self, callback: RenderingCallback) -> Result<RenderingCallbackToken>;

    /// Removes the callback registered under `token`. Unknown tokens are ignored.
    fn unregister(&self, token: RenderingCallbackToken);
}

impl<T: FrameScheduler + ?Sized> FrameScheduler for Arc<T> {
    fn register(&self, callback: RenderingCallback) -> Result<RenderingCallbackToken> {
        (**self).register(callback)
    }

    fn unregister(&self, token: RenderingCallbackToken) {
        (**self).unregister(token)
    }
}
