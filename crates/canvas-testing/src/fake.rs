//! In-memory adapter that records every service call the control makes.
//!
//! Failures can be scheduled ahead of time and a device can be marked lost,
//! so tests can drive the control through its error paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use canvas_core::{
    CanvasControlAdapter, CanvasDevice, CanvasError, CanvasImageSource, Color, DrawingSession,
    FrameScheduler, HostEvents, ImageControl, PixelSize, RenderingCallback, RenderingCallbackToken,
    Result, RoutedHandler, Size, SizeChangedEventArgs, SizeChangedHandler, UserControlBase,
};
use canvas_runtime_std::StdFrameScheduler;
use parking_lot::Mutex;

#[derive(Debug)]
pub struct FakeDevice {
    id: usize,
    lost: AtomicBool,
}

impl FakeDevice {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.is_lost() {
            Err(CanvasError::DeviceLost(format!("fake device {} removed", self.id)))
        } else {
            Ok(())
        }
    }
}

impl CanvasDevice for FakeDevice {}

/// Everything a closed session drew.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawnFrame {
    pub device_id: usize,
    pub size: PixelSize,
    pub clear_color: Color,
    pub commands: Vec<String>,
}

/// Session bookkeeping shared by all image sources of one adapter.
#[derive(Debug, Default)]
pub struct SessionLog {
    opened: AtomicUsize,
    closed: AtomicUsize,
    frames: Mutex<Vec<DrawnFrame>>,
}

impl SessionLog {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> Vec<DrawnFrame> {
        self.frames.lock().clone()
    }

    pub fn last_frame(&self) -> Option<DrawnFrame> {
        self.frames.lock().last().cloned()
    }
}

#[derive(Debug)]
pub struct FakeDrawingSession {
    log: Arc<SessionLog>,
    device: Arc<FakeDevice>,
    frame: DrawnFrame,
}

impl FakeDrawingSession {
    /// Records a drawing command.
    pub fn draw(&mut self, command: impl Into<String>) {
        self.frame.commands.push(command.into());
    }

    pub fn commands(&self) -> &[String] {
        &self.frame.commands
    }

    pub fn clear_color(&self) -> Color {
        self.frame.clear_color
    }

    pub fn size(&self) -> PixelSize {
        self.frame.size
    }
}

impl DrawingSession for FakeDrawingSession {
    fn close(&mut self) -> Result<()> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        self.log.frames.lock().push(self.frame.clone());
        self.device.check()
    }
}

#[derive(Debug)]
pub struct FakeImageSource {
    size: PixelSize,
    device: Arc<FakeDevice>,
    log: Arc<SessionLog>,
}

impl FakeImageSource {
    pub fn device(&self) -> &Arc<FakeDevice> {
        &self.device
    }
}

impl CanvasImageSource for FakeImageSource {
    type DrawingSession = FakeDrawingSession;

    fn create_drawing_session(&self, clear_color: Color) -> Result<FakeDrawingSession> {
        self.device.check()?;
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeDrawingSession {
            log: Arc::clone(&self.log),
            device: Arc::clone(&self.device),
            frame: DrawnFrame {
                device_id: self.device.id,
                size: self.size,
                clear_color,
                commands: Vec::new(),
            },
        })
    }

    fn size(&self) -> PixelSize {
        self.size
    }
}

#[derive(Debug, Default)]
pub struct FakeImageControl {
    source: Mutex<Option<Arc<FakeImageSource>>>,
    source_sets: AtomicUsize,
}

impl FakeImageControl {
    pub fn source(&self) -> Option<Arc<FakeImageSource>> {
        self.source.lock().clone()
    }

    /// Number of times a source (or `None`) was assigned.
    pub fn source_sets(&self) -> usize {
        self.source_sets.load(Ordering::SeqCst)
    }
}

impl ImageControl for FakeImageControl {
    type Source = FakeImageSource;

    fn set_source(&self, source: Option<Arc<FakeImageSource>>) {
        self.source_sets.fetch_add(1, Ordering::SeqCst);
        *self.source.lock() = source;
    }
}

/// Base control whose notifications are fired by the test.
///
/// Measure returns the available size and arrange the final size.
#[derive(Default)]
pub struct FakeHost {
    events: HostEvents,
    size: Mutex<Size>,
    content: Mutex<Option<Arc<FakeImageControl>>>,
    content_sets: AtomicUsize,
    templates_applied: AtomicUsize,
}

impl FakeHost {
    pub fn fire_loaded(&self) {
        self.events.raise_loaded();
    }

    pub fn fire_unloaded(&self) {
        self.events.raise_unloaded();
    }

    pub fn fire_size_changed(&self, new_size: Size) {
        let previous_size = std::mem::replace(&mut *self.size.lock(), new_size);
        self.events.raise_size_changed(&SizeChangedEventArgs {
            previous_size,
            new_size,
        });
    }

    pub fn content(&self) -> Option<Arc<FakeImageControl>> {
        self.content.lock().clone()
    }

    pub fn content_sets(&self) -> usize {
        self.content_sets.load(Ordering::SeqCst)
    }

    pub fn templates_applied(&self) -> usize {
        self.templates_applied.load(Ordering::SeqCst)
    }
}

impl UserControlBase for FakeHost {
    type Content = FakeImageControl;

    fn measure_override(&self, available_size: Size) -> Size {
        available_size
    }

    fn arrange_override(&self, final_size: Size) -> Size {
        final_size
    }

    fn on_apply_template(&self) {
        self.templates_applied.fetch_add(1, Ordering::SeqCst);
    }

    fn set_content(&self, content: Arc<FakeImageControl>) {
        self.content_sets.fetch_add(1, Ordering::SeqCst);
        *self.content.lock() = Some(content);
    }

    fn add_loaded(&self, handler: RoutedHandler) {
        self.events.add_loaded(handler);
    }

    fn add_unloaded(&self, handler: RoutedHandler) {
        self.events.add_unloaded(handler);
    }

    fn add_size_changed(&self, handler: SizeChangedHandler) {
        self.events.add_size_changed(handler);
    }
}

#[derive(Debug, Default)]
struct FailurePlan {
    device_creations: usize,
    surface_creations: usize,
    registrations: usize,
}

/// Adapter backed by fakes and a [`StdFrameScheduler`] ticked by the test.
#[derive(Debug, Default)]
pub struct FakeAdapter {
    scheduler: Arc<StdFrameScheduler>,
    devices: Mutex<Vec<Arc<FakeDevice>>>,
    surfaces: Mutex<Vec<PixelSize>>,
    sessions: Arc<SessionLog>,
    registrations: AtomicUsize,
    unregistrations: AtomicUsize,
    frame_requests: AtomicUsize,
    failures: Mutex<FailurePlan>,
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduler(&self) -> &Arc<StdFrameScheduler> {
        &self.scheduler
    }

    pub fn sessions(&self) -> &Arc<SessionLog> {
        &self.sessions
    }

    pub fn devices_created(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn current_device(&self) -> Option<Arc<FakeDevice>> {
        self.devices.lock().last().cloned()
    }

    /// Sizes of every surface created so far, in creation order.
    pub fn surfaces_created(&self) -> Vec<PixelSize> {
        self.surfaces.lock().clone()
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn unregistrations(&self) -> usize {
        self.unregistrations.load(Ordering::SeqCst)
    }

    /// Number of explicit frame requests made by the control.
    pub fn frame_requests(&self) -> usize {
        self.frame_requests.load(Ordering::SeqCst)
    }

    /// Makes the next `count` device creations fail.
    pub fn fail_device_creations(&self, count: usize) {
        self.failures.lock().device_creations = count;
    }

    /// Makes the next `count` surface creations fail.
    pub fn fail_surface_creations(&self, count: usize) {
        self.failures.lock().surface_creations = count;
    }

    /// Makes the next `count` rendering callback registrations fail.
    pub fn fail_registrations(&self, count: usize) {
        self.failures.lock().registrations = count;
    }

    /// Marks the most recently created device as lost.
    pub fn lose_device(&self) {
        if let Some(device) = self.current_device() {
            device.mark_lost();
        }
    }

    fn take_failure(&self, slot: impl FnOnce(&mut FailurePlan) -> &mut usize) -> bool {
        let mut failures = self.failures.lock();
        let remaining = slot(&mut *failures);
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }
}

impl CanvasControlAdapter for FakeAdapter {
    type UserControl = FakeHost;
    type Device = FakeDevice;
    type ImageSource = FakeImageSource;
    type ImageControl = FakeImageControl;

    fn create_user_control(&self) -> Result<FakeHost> {
        Ok(FakeHost::default())
    }

    fn create_canvas_device(&self) -> Result<Arc<FakeDevice>> {
        if self.take_failure(|plan| &mut plan.device_creations) {
            return Err(CanvasError::DeviceCreation("no adapter available".into()));
        }
        let mut devices = self.devices.lock();
        let device = Arc::new(FakeDevice {
            id: devices.len() + 1,
            lost: AtomicBool::new(false),
        });
        devices.push(Arc::clone(&device));
        Ok(device)
    }

    fn add_composition_rendering_callback(
        &self,
        callback: RenderingCallback,
    ) -> Result<RenderingCallbackToken> {
        if self.take_failure(|plan| &mut plan.registrations) {
            return Err(CanvasError::RenderingCallback("compositor unavailable".into()));
        }
        let token = self.scheduler.register(callback)?;
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(token)
    }

    fn remove_composition_rendering_callback(&self, token: RenderingCallbackToken) {
        self.unregistrations.fetch_add(1, Ordering::SeqCst);
        self.scheduler.unregister(token);
    }

    fn request_frame(&self) {
        self.frame_requests.fetch_add(1, Ordering::SeqCst);
        self.scheduler.request_frame();
    }

    fn create_canvas_image_source(
        &self,
        device: &Arc<FakeDevice>,
        size: PixelSize,
    ) -> Result<FakeImageSource> {
        device.check()?;
        if self.take_failure(|plan| &mut plan.surface_creations) {
            return Err(CanvasError::SurfaceCreation {
                width: size.width,
                height: size.height,
                reason: "out of video memory".into(),
            });
        }
        self.surfaces.lock().push(size);
        Ok(FakeImageSource {
            size,
            device: Arc::clone(device),
            log: Arc::clone(&self.sessions),
        })
    }

    fn create_image_control(&self) -> Result<FakeImageControl> {
        Ok(FakeImageControl::default())
    }
}
