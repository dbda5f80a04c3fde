//! Standard frame scheduling backed by Rust's `std` library.
//!
//! [`StdFrameScheduler`] implements [`canvas_core::FrameScheduler`]: adapters
//! register per-frame rendering callbacks with it and the host's event loop
//! calls [`StdFrameScheduler::tick`] once per frame.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use canvas_core::{FrameScheduler, RenderingCallback, RenderingCallbackToken, Result};
use parking_lot::{Mutex, RwLock};

type FrameWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Frame scheduler that runs registered callbacks when ticked.
pub struct StdFrameScheduler {
    callbacks: Mutex<Vec<(RenderingCallbackToken, RenderingCallback)>>,
    next_token: AtomicU64,
    frame_requested: AtomicBool,
    frame_waker: RwLock<Option<FrameWaker>>,
}

impl StdFrameScheduler {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
            frame_requested: AtomicBool::new(false),
            frame_waker: RwLock::new(None),
        }
    }

    /// Runs every registered callback once, in registration order.
    ///
    /// Callbacks run over a snapshot with no lock held, so they may register or
    /// unregister callbacks; a callback unregistered mid-tick is skipped.
    /// Failures are logged and do not stop the tick. Returns the number of
    /// callbacks that failed.
    pub fn tick(&self, frame_time_nanos: u64) -> usize {
        self.frame_requested.store(false, Ordering::SeqCst);
        let snapshot: Vec<(RenderingCallbackToken, RenderingCallback)> =
            self.callbacks.lock().clone();

        let mut failures = 0;
        for (token, callback) in snapshot {
            if !self.is_registered(token) {
                continue;
            }
            if let Err(err) = callback(frame_time_nanos) {
                failures += 1;
                log::error!("rendering callback {token:?} failed: {err}");
            }
        }
        failures
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_registered(&self, token: RenderingCallbackToken) -> bool {
        self.callbacks.lock().iter().any(|(entry, _)| *entry == token)
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever a frame is requested, including on
    /// callback registration.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.frame_waker.write() = Some(Arc::new(waker));
    }

    /// Clears any registered frame waker.
    pub fn clear_frame_waker(&self) {
        *self.frame_waker.write() = None;
    }

    /// Marks a frame as pending and runs the waker, if any.
    ///
    /// The waker runs on the calling thread with no scheduler lock held, so it
    /// may tick synchronously.
    pub fn request_frame(&self) {
        self.frame_requested.store(true, Ordering::SeqCst);
        let waker = self.frame_waker.read().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdFrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdFrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdFrameScheduler")
            .field("callbacks", &self.callback_count())
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl FrameScheduler for StdFrameScheduler {
    fn register(&self, callback: RenderingCallback) -> Result<RenderingCallbackToken> {
        let token = RenderingCallbackToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().push((token, callback));
        log::trace!("registered rendering callback {token:?}");
        self.request_frame();
        Ok(token)
    }

    fn unregister(&self, token: RenderingCallbackToken) {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(entry, _)| *entry != token);
        if callbacks.len() == before {
            log::trace!("ignoring unknown rendering callback {token:?}");
        }
    }
}

/// Frame clock backed by [`std::time`], reporting nanoseconds since creation.
#[derive(Debug, Clone)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Frame timestamp suitable for [`StdFrameScheduler::tick`].
    pub fn now_nanos(&self) -> u64 {
        self.elapsed().as_nanos().min(u64::MAX as u128) as u64
    }

    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
