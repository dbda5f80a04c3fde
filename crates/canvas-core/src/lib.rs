//! Core of the Canvas-RS drawable surface control.
//!
//! [`CanvasControl`] owns a graphics device and a size-dependent image
//! surface, raises CreatingResources when a device appears and Drawing when a
//! redraw is pending, and hands handlers a scoped drawing session. Everything
//! host-specific is reached through a [`CanvasControlAdapter`].

mod adapter;
mod control;
mod drawing;
mod error;
mod event;
pub mod platform;

pub use adapter::{
    AdapterDrawingSession, CanvasControlAdapter, CanvasDevice, CanvasImageSource, DrawingSession,
    HostEvents, ImageControl, RoutedHandler, SizeChangedEventArgs, SizeChangedHandler,
    UserControlBase,
};
pub use control::{
    CanvasControl, CanvasControlOptions, ControlEvents, CreatingResourcesHandler, DrawingHandler,
    FrameworkOverrides, ResourceCreator,
};
pub use drawing::{CanvasDrawingEventArgs, CreateResourcesReason, CreatingResourcesEventArgs};
pub use error::{BoxError, CanvasError, Result};
pub use event::{EventRegistrationToken, EventSource};
pub use platform::{FrameScheduler, RenderingCallback, RenderingCallbackToken};

pub use canvas_ui_graphics::{Color, PixelSize, Size};

pub mod prelude {
    pub use crate::adapter::{CanvasImageSource, DrawingSession, ImageControl, UserControlBase};
    pub use crate::control::{
        CanvasControl, CanvasControlOptions, ControlEvents, FrameworkOverrides, ResourceCreator,
    };
    pub use crate::drawing::{CanvasDrawingEventArgs, CreateResourcesReason};
    pub use crate::error::{CanvasError, Result};
    pub use canvas_ui_graphics::prelude::*;
}
