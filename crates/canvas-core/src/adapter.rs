//! Service boundary between the canvas control and its host.
//!
//! The control never talks to the UI framework or the graphics API directly.
//! Everything it needs (the base control it composes, the graphics device, the
//! frame tick, image surfaces and the element presenting them) comes from a
//! [`CanvasControlAdapter`]. Tests plug in fakes; hosts plug in real services.

use std::convert::Infallible;
use std::sync::Arc;

use canvas_ui_graphics::{Color, PixelSize, Size};

use crate::error::Result;
use crate::event::EventSource;
use crate::platform::{RenderingCallback, RenderingCallbackToken};

/// Arguments of the host's size-changed notification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeChangedEventArgs {
    pub previous_size: Size,
    pub new_size: Size,
}

/// Host notification without arguments (loaded, unloaded).
pub type RoutedHandler = Box<dyn Fn() + Send + Sync + 'static>;

/// Host size-changed notification.
pub type SizeChangedHandler = Box<dyn Fn(&SizeChangedEventArgs) + Send + Sync + 'static>;

/// Base behavior of the host control the canvas composes with.
///
/// The canvas delegates layout negotiation here and only observes the sizes
/// it returns.
pub trait UserControlBase: Send + Sync + 'static {
    /// Element type this control can host as its content.
    type Content;

    /// Default measure pass; returns the desired size.
    fn measure_override(&self, available_size: Size) -> Size;

    /// Default arrange pass; returns the final size.
    fn arrange_override(&self, final_size: Size) -> Size;

    /// Applies the control template. Called before the canvas attaches its content.
    fn on_apply_template(&self) {}

    /// Places `content` into the control's visual tree.
    fn set_content(&self, content: Arc<Self::Content>);

    /// Subscribes to the notification raised when the control joins the UI tree.
    fn add_loaded(&self, handler: RoutedHandler);

    /// Subscribes to the notification raised when the control leaves the UI tree.
    fn add_unloaded(&self, handler: RoutedHandler);

    /// Subscribes to layout size changes.
    fn add_size_changed(&self, handler: SizeChangedHandler);
}

/// Graphics device capable of backing image surfaces.
pub trait CanvasDevice: Send + Sync + 'static {}

/// Scoped handle through which drawing commands are issued.
pub trait DrawingSession {
    /// Ends the session and flushes its commands to the surface.
    ///
    /// Called exactly once per session by the owner of the session.
    fn close(&mut self) -> Result<()>;
}

/// Composition-backed drawable surface of a fixed pixel size.
pub trait CanvasImageSource: Send + Sync + 'static {
    type DrawingSession: DrawingSession;

    /// Opens a session drawing into the whole surface, cleared to `clear_color`.
    fn create_drawing_session(&self, clear_color: Color) -> Result<Self::DrawingSession>;

    fn size(&self) -> PixelSize;
}

/// Host element that presents an image surface.
pub trait ImageControl: Send + Sync + 'static {
    type Source;

    /// Presents `source`, or nothing when `None`.
    fn set_source(&self, source: Option<Arc<Self::Source>>);
}

/// Factory and service boundary consumed by [`crate::CanvasControl`].
///
/// All operations are synchronous from the control's point of view and
/// report failures as [`crate::CanvasError`].
pub trait CanvasControlAdapter: Send + Sync + 'static {
    type UserControl: UserControlBase<Content = Self::ImageControl>;
    type Device: CanvasDevice;
    type ImageSource: CanvasImageSource;
    type ImageControl: ImageControl<Source = Self::ImageSource>;

    /// Creates the host base control the canvas is composed with.
    fn create_user_control(&self) -> Result<Self::UserControl>;

    fn create_canvas_device(&self) -> Result<Arc<Self::Device>>;

    /// Registers the per-frame rendering callback with the host compositor.
    fn add_composition_rendering_callback(
        &self,
        callback: RenderingCallback,
    ) -> Result<RenderingCallbackToken>;

    fn remove_composition_rendering_callback(&self, token: RenderingCallbackToken);

    /// Asks the host to tick the rendering callbacks soon.
    ///
    /// May be called from any thread. Hosts may tick synchronously from here.
    fn request_frame(&self);

    /// Creates an image surface of `size` pixels bound to `device`.
    fn create_canvas_image_source(
        &self,
        device: &Arc<Self::Device>,
        size: PixelSize,
    ) -> Result<Self::ImageSource>;

    /// Creates the child element that presents the image surface.
    fn create_image_control(&self) -> Result<Self::ImageControl>;
}

/// Loaded, unloaded and size-changed subscribers of a host control.
///
/// Notifications dispatch over a snapshot, so a handler may subscribe more
/// handlers while a notification runs.
#[derive(Debug, Default)]
pub struct HostEvents {
    loaded: EventSource<dyn Fn() + Send + Sync>,
    unloaded: EventSource<dyn Fn() + Send + Sync>,
    size_changed: EventSource<dyn Fn(&SizeChangedEventArgs) + Send + Sync>,
}

impl HostEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_loaded(&self, handler: RoutedHandler) {
        self.loaded.add(Arc::from(handler));
    }

    pub fn add_unloaded(&self, handler: RoutedHandler) {
        self.unloaded.add(Arc::from(handler));
    }

    pub fn add_size_changed(&self, handler: SizeChangedHandler) {
        self.size_changed.add(Arc::from(handler));
    }

    pub fn raise_loaded(&self) {
        Self::raise(&self.loaded, |handler| handler());
    }

    pub fn raise_unloaded(&self) {
        Self::raise(&self.unloaded, |handler| handler());
    }

    pub fn raise_size_changed(&self, args: &SizeChangedEventArgs) {
        Self::raise(&self.size_changed, |handler| handler(args));
    }

    fn raise<H: ?Sized>(source: &EventSource<H>, mut invoke: impl FnMut(&H)) {
        let dispatched = source.invoke_all::<Infallible>(|handler| {
            invoke(handler);
            Ok(())
        });
        if let Err(never) = dispatched {
            match never {}
        }
    }
}

/// Drawing session type produced by an adapter's image sources.
pub type AdapterDrawingSession<A> =
    <<A as CanvasControlAdapter>::ImageSource as CanvasImageSource>::DrawingSession;

#[cfg(test)]
#[path = "tests/adapter_tests.rs"]
mod tests;
