//! The canvas control: device lifecycle, size-dependent surfaces and the
//! invalidate/redraw state machine.
//!
//! Conceptual states, derived from the fields rather than stored:
//!
//! | state                       | loaded | device | surface |
//! |-----------------------------|--------|--------|---------|
//! | Unloaded                    | no     | -      | -       |
//! | Loaded, no device           | yes    | no     | no      |
//! | Loaded, device, no surface  | yes    | yes    | no      |
//! | Loaded, ready               | yes    | yes    | yes     |
//!
//! Layout and frame callbacks run on the UI thread. [`ResourceCreator::invalidate`]
//! may be called from any thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use canvas_ui_graphics::{Color, PixelSize, Size};
use parking_lot::Mutex;

use crate::adapter::{
    AdapterDrawingSession, CanvasControlAdapter, CanvasImageSource, ImageControl,
    SizeChangedEventArgs, UserControlBase,
};
use crate::drawing::{CanvasDrawingEventArgs, CreateResourcesReason, CreatingResourcesEventArgs};
use crate::error::{CanvasError, Result};
use crate::event::{EventRegistrationToken, EventSource};
use crate::platform::{RenderingCallback, RenderingCallbackToken};

/// Handler of the CreatingResources event.
pub type CreatingResourcesHandler<A> = dyn Fn(&CanvasControl<A>, &CreatingResourcesEventArgs) -> Result<()>
    + Send
    + Sync
    + 'static;

/// Handler of the Drawing event.
pub type DrawingHandler<A> = dyn Fn(&CanvasControl<A>, &CanvasDrawingEventArgs<AdapterDrawingSession<A>>) -> Result<()>
    + Send
    + Sync
    + 'static;

/// Configuration of a [`CanvasControl`].
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasControlOptions {
    clear_color: Color,
    dpi_scale: f32,
    recover_from_device_loss: bool,
}

impl Default for CanvasControlOptions {
    fn default() -> Self {
        Self {
            clear_color: Color::TRANSPARENT,
            dpi_scale: 1.0,
            recover_from_device_loss: true,
        }
    }
}

impl CanvasControlOptions {
    /// Sets the color each drawing session is cleared to before handlers run.
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Sets the number of surface pixels per device-independent unit.
    ///
    /// Non-finite or non-positive scales fall back to `1.0`.
    pub fn with_dpi_scale(mut self, scale: f32) -> Self {
        self.dpi_scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        self
    }

    /// Controls whether a lost device is dropped and recreated on the next frame.
    pub fn with_device_loss_recovery(mut self, enabled: bool) -> Self {
        self.recover_from_device_loss = enabled;
        self
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn dpi_scale(&self) -> f32 {
        self.dpi_scale
    }

    pub fn recovers_from_device_loss(&self) -> bool {
        self.recover_from_device_loss
    }
}

/// Device access and invalidation.
pub trait ResourceCreator {
    type Device;

    /// Returns the current device; fails with [`CanvasError::NoDevice`] before one exists.
    fn device(&self) -> Result<Arc<Self::Device>>;

    /// Requests a redraw on the next frame tick and, while loaded, asks the
    /// host for a frame. Safe to call from any thread.
    fn invalidate(&self);
}

/// Layout hooks the host framework calls on the control.
pub trait FrameworkOverrides {
    fn measure_override(&self, available_size: Size) -> Result<Size>;
    fn arrange_override(&self, final_size: Size) -> Result<Size>;
    fn on_apply_template(&self);
}

/// Registration of CreatingResources and Drawing handlers.
pub trait ControlEvents: Sized {
    type DrawingSession: crate::adapter::DrawingSession;

    fn add_creating_resources<F>(&self, handler: F) -> EventRegistrationToken
    where
        F: Fn(&Self, &CreatingResourcesEventArgs) -> Result<()> + Send + Sync + 'static;

    fn remove_creating_resources(&self, token: EventRegistrationToken) -> bool;

    fn add_drawing<F>(&self, handler: F) -> EventRegistrationToken
    where
        F: Fn(&Self, &CanvasDrawingEventArgs<Self::DrawingSession>) -> Result<()>
            + Send
            + Sync
            + 'static;

    fn remove_drawing(&self, token: EventRegistrationToken) -> bool;
}

struct Resources<A: CanvasControlAdapter> {
    device: Option<Arc<A::Device>>,
    image_source: Option<Arc<A::ImageSource>>,
    surface_size: PixelSize,
    current_size: Size,
    is_loaded: bool,
    rendering_token: Option<RenderingCallbackToken>,
    template_applied: bool,
    devices_created: u32,
}

impl<A: CanvasControlAdapter> Resources<A> {
    fn new() -> Self {
        Self {
            device: None,
            image_source: None,
            surface_size: PixelSize::default(),
            current_size: Size::ZERO,
            is_loaded: false,
            rendering_token: None,
            template_applied: false,
            devices_created: 0,
        }
    }
}

struct ControlInner<A: CanvasControlAdapter> {
    adapter: Arc<A>,
    base: A::UserControl,
    image_control: Arc<A::ImageControl>,
    options: CanvasControlOptions,
    draw_lock: Mutex<()>,
    draw_needed: AtomicBool,
    frame_deferred: AtomicBool,
    resources: Mutex<Resources<A>>,
    creating_resources: EventSource<CreatingResourcesHandler<A>>,
    drawing: EventSource<DrawingHandler<A>>,
}

impl<A: CanvasControlAdapter> Drop for ControlInner<A> {
    fn drop(&mut self) {
        let resources = self.resources.get_mut();
        resources.is_loaded = false;
        if let Some(token) = resources.rendering_token.take() {
            log::debug!("canvas control dropped while loaded; unregistering {token:?}");
            self.adapter.remove_composition_rendering_callback(token);
        }
    }
}

/// Outcome of surface reconciliation, applied to the image control outside the lock.
enum SurfaceChange<S> {
    Unchanged,
    Created(Arc<S>),
    Released,
}

/// Drawable surface control.
///
/// A cheap, cloneable handle; clones refer to the same control. The per-frame
/// callback is unregistered on unload, or when the last handle is dropped.
pub struct CanvasControl<A: CanvasControlAdapter> {
    inner: Arc<ControlInner<A>>,
}

impl<A: CanvasControlAdapter> Clone for CanvasControl<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: CanvasControlAdapter> CanvasControl<A> {
    pub fn new(adapter: Arc<A>) -> Result<Self> {
        Self::with_options(adapter, CanvasControlOptions::default())
    }

    /// Creates the base control and the image control, then subscribes to the
    /// host's loaded, unloaded and size-changed notifications.
    pub fn with_options(adapter: Arc<A>, options: CanvasControlOptions) -> Result<Self> {
        let base = adapter.create_user_control()?;
        let image_control = Arc::new(adapter.create_image_control()?);
        let control = Self {
            inner: Arc::new(ControlInner {
                adapter,
                base,
                image_control,
                options,
                draw_lock: Mutex::new(()),
                draw_needed: AtomicBool::new(false),
                frame_deferred: AtomicBool::new(false),
                resources: Mutex::new(Resources::new()),
                creating_resources: EventSource::new(),
                drawing: EventSource::new(),
            }),
        };
        control.register_event_handlers();
        Ok(control)
    }

    fn downgrade(&self) -> Weak<ControlInner<A>> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<ControlInner<A>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn register_event_handlers(&self) {
        let base = &self.inner.base;

        let weak = self.downgrade();
        base.add_loaded(Box::new(move || {
            if let Some(control) = Self::upgrade(&weak) {
                if let Err(err) = control.on_loaded() {
                    log::warn!("canvas control failed to load: {err}");
                }
            }
        }));

        let weak = self.downgrade();
        base.add_unloaded(Box::new(move || {
            if let Some(control) = Self::upgrade(&weak) {
                control.on_unloaded();
            }
        }));

        let weak = self.downgrade();
        base.add_size_changed(Box::new(move |args| {
            if let Some(control) = Self::upgrade(&weak) {
                if let Err(err) = control.on_size_changed(args) {
                    log::warn!("canvas control failed to resize: {err}");
                }
            }
        }));
    }

    fn rendering_callback(&self) -> RenderingCallback {
        let weak = self.downgrade();
        Arc::new(move |_frame_time_nanos| match Self::upgrade(&weak) {
            Some(control) => control.on_render_callback(),
            None => Ok(()),
        })
    }

    /// Host notification: the control joined the UI tree.
    ///
    /// Registers the per-frame callback. Repeated notifications while loaded
    /// are ignored.
    ///
    /// The adapter may tick the new callback before registration returns, so
    /// no lock is held across the call.
    pub fn on_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            log::trace!("canvas control already loaded; ignoring duplicate notification");
            return Ok(());
        }
        let token = self
            .inner
            .adapter
            .add_composition_rendering_callback(self.rendering_callback())?;

        let stored = {
            let mut resources = self.inner.resources.lock();
            if resources.is_loaded {
                false
            } else {
                resources.is_loaded = true;
                resources.rendering_token = Some(token);
                true
            }
        };
        if stored {
            log::debug!("canvas control loaded; rendering callback {token:?}");
        } else {
            log::debug!("canvas control loaded concurrently; removing extra callback {token:?}");
            self.inner.adapter.remove_composition_rendering_callback(token);
        }
        Ok(())
    }

    /// Host notification: the control left the UI tree.
    ///
    /// Unregisters the per-frame callback exactly once. Device and surface are
    /// kept so a later reload does not recreate them.
    pub fn on_unloaded(&self) {
        let token = {
            let mut resources = self.inner.resources.lock();
            if !resources.is_loaded {
                return;
            }
            resources.is_loaded = false;
            resources.rendering_token.take()
        };
        if let Some(token) = token {
            log::debug!("canvas control unloaded; removing rendering callback {token:?}");
            self.inner.adapter.remove_composition_rendering_callback(token);
        }
    }

    /// Host notification: the layout size changed.
    pub fn on_size_changed(&self, args: &SizeChangedEventArgs) -> Result<()> {
        self.record_size(args.new_size);
        self.ensure_size_dependent_resources()
    }

    fn record_size(&self, size: Size) {
        let mut resources = self.inner.resources.lock();
        if resources.current_size != size {
            log::trace!(
                "canvas size {:?} -> {:?}",
                resources.current_size,
                size
            );
            resources.current_size = size;
        }
    }

    /// Creates the device on first use, then (re)creates the surface when the
    /// size changed or no surface exists. Does nothing when both are current.
    pub fn ensure_size_dependent_resources(&self) -> Result<()> {
        if let Some(reason) = self.ensure_device()? {
            let args = CreatingResourcesEventArgs { reason };
            self.inner
                .creating_resources
                .invoke_all(|handler| handler(self, &args))?;
            self.inner.draw_needed.store(true, Ordering::SeqCst);
        }

        match self.reconcile_surface() {
            Ok(SurfaceChange::Unchanged) => {}
            Ok(SurfaceChange::Created(source)) => {
                self.inner.image_control.set_source(Some(source));
                self.inner.draw_needed.store(true, Ordering::SeqCst);
            }
            Ok(SurfaceChange::Released) => self.inner.image_control.set_source(None),
            Err(err) => {
                log::warn!("canvas surface creation failed: {err}");
                self.inner.image_control.set_source(None);
                self.inner.draw_needed.store(true, Ordering::SeqCst);
                self.recover_if_device_lost(&err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Creates the device when there is none. Returns the CreatingResources
    /// reason when this call created it.
    ///
    /// Adapter calls run with the resources lock released; the result is
    /// stored only if no other caller installed a device meanwhile.
    fn ensure_device(&self) -> Result<Option<CreateResourcesReason>> {
        if self.has_device() {
            return Ok(None);
        }
        let device = self.inner.adapter.create_canvas_device().map_err(|err| {
            log::warn!("canvas device creation failed: {err}");
            err
        })?;

        let mut resources = self.inner.resources.lock();
        if resources.device.is_some() {
            log::trace!("device installed concurrently; discarding the new one");
            return Ok(None);
        }
        resources.device = Some(device);
        let reason = if resources.devices_created == 0 {
            CreateResourcesReason::FirstTime
        } else {
            CreateResourcesReason::NewDevice
        };
        resources.devices_created += 1;
        log::debug!("canvas device created ({reason:?})");
        Ok(Some(reason))
    }

    fn reconcile_surface(&self) -> Result<SurfaceChange<A::ImageSource>> {
        let (device, pixel_size) = {
            let mut resources = self.inner.resources.lock();
            let Some(device) = resources.device.clone() else {
                return Ok(SurfaceChange::Unchanged);
            };
            let pixel_size = resources.current_size.to_pixels(self.inner.options.dpi_scale);
            if pixel_size.is_empty() {
                return Ok(match resources.image_source.take() {
                    Some(_) => {
                        resources.surface_size = PixelSize::default();
                        SurfaceChange::Released
                    }
                    None => SurfaceChange::Unchanged,
                });
            }
            if resources.image_source.is_some() && resources.surface_size == pixel_size {
                return Ok(SurfaceChange::Unchanged);
            }
            resources.image_source = None;
            resources.surface_size = PixelSize::default();
            (device, pixel_size)
        };

        let source = Arc::new(
            self.inner
                .adapter
                .create_canvas_image_source(&device, pixel_size)?,
        );

        let mut resources = self.inner.resources.lock();
        let same_device = resources
            .device
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &device));
        if !same_device {
            log::trace!("device replaced while creating a surface; discarding it");
            return Ok(SurfaceChange::Unchanged);
        }
        log::debug!(
            "canvas surface created at {}x{}",
            pixel_size.width,
            pixel_size.height
        );
        resources.image_source = Some(Arc::clone(&source));
        resources.surface_size = pixel_size;
        Ok(SurfaceChange::Created(source))
    }

    /// Per-frame callback. Draws at most once, and only when a redraw is pending.
    ///
    /// The drawing session is closed before any handler failure propagates.
    /// A callback arriving while another draw is in progress (a host ticking
    /// synchronously from [`ResourceCreator::invalidate`] inside a handler)
    /// is deferred, and a new frame is requested once that draw finishes.
    pub fn on_render_callback(&self) -> Result<()> {
        let Some(draw) = self.inner.draw_lock.try_lock() else {
            self.inner.frame_deferred.store(true, Ordering::SeqCst);
            log::trace!("draw already in progress; deferring frame");
            return Ok(());
        };
        let result = self.draw_frame();
        drop(draw);

        if self.inner.frame_deferred.swap(false, Ordering::SeqCst) && self.is_loaded() {
            self.inner.adapter.request_frame();
        }
        result
    }

    fn draw_frame(&self) -> Result<()> {
        if !self.inner.draw_needed.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.ensure_size_dependent_resources()?;
        let Some(image_source) = self.inner.resources.lock().image_source.clone() else {
            log::trace!("redraw pending but no surface yet");
            return Ok(());
        };

        // Cleared before dispatch so an invalidation raised while handlers run
        // schedules exactly one more frame.
        self.inner.draw_needed.store(false, Ordering::SeqCst);

        let session = match image_source.create_drawing_session(self.inner.options.clear_color) {
            Ok(session) => session,
            Err(err) => {
                log::warn!("failed to open drawing session: {err}");
                self.inner.draw_needed.store(true, Ordering::SeqCst);
                self.recover_if_device_lost(&err);
                return Err(err);
            }
        };

        let args = CanvasDrawingEventArgs::new(session);
        let drawn = self
            .inner
            .drawing
            .invoke_all(|handler| handler(self, &args));
        let closed = args.close();
        drop(args);

        let result = drawn.and(closed);
        if let Err(err) = &result {
            log::warn!("canvas draw failed: {err}");
            self.recover_if_device_lost(err);
        }
        result
    }

    fn recover_if_device_lost(&self, err: &CanvasError) {
        if !err.is_device_lost() || !self.inner.options.recover_from_device_loss {
            return;
        }
        let released_surface = {
            let mut resources = self.inner.resources.lock();
            resources.device = None;
            resources.surface_size = PixelSize::default();
            resources.image_source.take().is_some()
        };
        if released_surface {
            self.inner.image_control.set_source(None);
        }
        self.inner.draw_needed.store(true, Ordering::SeqCst);
        log::debug!("canvas device lost; resources will be recreated on the next frame");
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.inner.adapter
    }

    /// The host base control this canvas is composed with.
    pub fn base(&self) -> &A::UserControl {
        &self.inner.base
    }

    pub fn image_control(&self) -> &Arc<A::ImageControl> {
        &self.inner.image_control
    }

    pub fn image_source(&self) -> Option<Arc<A::ImageSource>> {
        self.inner.resources.lock().image_source.clone()
    }

    pub fn options(&self) -> &CanvasControlOptions {
        &self.inner.options
    }

    /// Last layout size observed, in device-independent units.
    pub fn size(&self) -> Size {
        self.inner.resources.lock().current_size
    }

    /// Pixel size of the current surface, or zero when there is none.
    pub fn pixel_size(&self) -> PixelSize {
        self.inner.resources.lock().surface_size
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.resources.lock().is_loaded
    }

    pub fn has_device(&self) -> bool {
        self.inner.resources.lock().device.is_some()
    }

    pub fn has_image_source(&self) -> bool {
        self.inner.resources.lock().image_source.is_some()
    }

    pub fn is_draw_needed(&self) -> bool {
        self.inner.draw_needed.load(Ordering::SeqCst)
    }
}

impl<A: CanvasControlAdapter> ResourceCreator for CanvasControl<A> {
    type Device = A::Device;

    fn device(&self) -> Result<Arc<A::Device>> {
        self.inner
            .resources
            .lock()
            .device
            .clone()
            .ok_or(CanvasError::NoDevice)
    }

    fn invalidate(&self) {
        self.inner.draw_needed.store(true, Ordering::SeqCst);
        if self.is_loaded() {
            self.inner.adapter.request_frame();
        }
    }
}

impl<A: CanvasControlAdapter> FrameworkOverrides for CanvasControl<A> {
    /// Delegates to the base measure pass and records the desired size.
    fn measure_override(&self, available_size: Size) -> Result<Size> {
        let desired = self.inner.base.measure_override(available_size);
        self.record_size(desired);
        self.ensure_size_dependent_resources()?;
        Ok(desired)
    }

    fn arrange_override(&self, final_size: Size) -> Result<Size> {
        let arranged = self.inner.base.arrange_override(final_size);
        self.record_size(arranged);
        self.ensure_size_dependent_resources()?;
        Ok(arranged)
    }

    /// Applies the base template, then attaches the image control once.
    fn on_apply_template(&self) {
        self.inner.base.on_apply_template();
        let first = {
            let mut resources = self.inner.resources.lock();
            !std::mem::replace(&mut resources.template_applied, true)
        };
        if first {
            self.inner
                .base
                .set_content(Arc::clone(&self.inner.image_control));
        }
    }
}

impl<A: CanvasControlAdapter> ControlEvents for CanvasControl<A> {
    type DrawingSession = AdapterDrawingSession<A>;

    fn add_creating_resources<F>(&self, handler: F) -> EventRegistrationToken
    where
        F: Fn(&Self, &CreatingResourcesEventArgs) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.creating_resources.add(Arc::new(handler))
    }

    fn remove_creating_resources(&self, token: EventRegistrationToken) -> bool {
        self.inner.creating_resources.remove(token)
    }

    fn add_drawing<F>(&self, handler: F) -> EventRegistrationToken
    where
        F: Fn(&Self, &CanvasDrawingEventArgs<Self::DrawingSession>) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.inner.drawing.add(Arc::new(handler))
    }

    fn remove_drawing(&self, token: EventRegistrationToken) -> bool {
        self.inner.drawing.remove(token)
    }
}

impl<A: CanvasControlAdapter> fmt::Debug for CanvasControl<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resources = self.inner.resources.lock();
        f.debug_struct("CanvasControl")
            .field("is_loaded", &resources.is_loaded)
            .field("has_device", &resources.device.is_some())
            .field("surface_size", &resources.surface_size)
            .field("current_size", &resources.current_size)
            .field("draw_needed", &self.inner.draw_needed.load(Ordering::SeqCst))
            .field("creating_resources", &self.inner.creating_resources)
            .field("drawing", &self.inner.drawing)
            .finish()
    }
}
