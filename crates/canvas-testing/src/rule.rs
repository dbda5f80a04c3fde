//! Test rule driving a [`CanvasControl`] over a [`FakeAdapter`].

use std::sync::Arc;

use canvas_core::{
    CanvasControl, CanvasControlOptions, FrameworkOverrides, Result, Size,
};

use crate::fake::{FakeAdapter, FakeHost};

/// Frame interval used by [`CanvasTestRule::advance_frame`].
pub const FRAME_INTERVAL_NANOS: u64 = 16_666_667;

pub struct CanvasTestRule {
    adapter: Arc<FakeAdapter>,
    control: CanvasControl<FakeAdapter>,
    frame_time_nanos: u64,
}

impl CanvasTestRule {
    /// Create a new test rule with a fresh fake adapter and default options.
    pub fn new() -> Result<Self> {
        Self::with_options(CanvasControlOptions::default())
    }

    pub fn with_options(options: CanvasControlOptions) -> Result<Self> {
        let adapter = Arc::new(FakeAdapter::new());
        let control = CanvasControl::with_options(Arc::clone(&adapter), options)?;
        Ok(Self {
            adapter,
            control,
            frame_time_nanos: 0,
        })
    }

    pub fn control(&self) -> &CanvasControl<FakeAdapter> {
        &self.control
    }

    pub fn adapter(&self) -> &Arc<FakeAdapter> {
        &self.adapter
    }

    pub fn host(&self) -> &FakeHost {
        self.control.base()
    }

    /// Applies the template, fires loaded and lays the control out at `size`.
    pub fn show(&mut self, size: Size) -> Result<()> {
        self.control.on_apply_template();
        self.host().fire_loaded();
        self.layout(size)?;
        Ok(())
    }

    /// Runs a measure pass followed by an arrange pass at `size`.
    pub fn layout(&self, size: Size) -> Result<Size> {
        self.control.measure_override(size)?;
        self.control.arrange_override(size)
    }

    /// Fires the host's size-changed notification.
    pub fn resize(&self, size: Size) {
        self.host().fire_size_changed(size);
    }

    pub fn load(&self) {
        self.host().fire_loaded();
    }

    pub fn unload(&self) {
        self.host().fire_unloaded();
    }

    /// Ticks the frame scheduler once. Returns the number of failed callbacks.
    pub fn advance_frame(&mut self) -> usize {
        self.frame_time_nanos += FRAME_INTERVAL_NANOS;
        self.adapter.scheduler().tick(self.frame_time_nanos)
    }

    /// Number of completed draws, as seen by the fake sessions.
    pub fn frames_drawn(&self) -> usize {
        self.adapter.sessions().closed()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `CanvasTestRule`.
pub fn run_test_canvas<R>(f: impl FnOnce(&mut CanvasTestRule) -> R) -> R {
    let mut rule = match CanvasTestRule::new() {
        Ok(rule) => rule,
        Err(err) => panic!("fake adapter failed to create the control: {err}"),
    };
    f(&mut rule)
}
