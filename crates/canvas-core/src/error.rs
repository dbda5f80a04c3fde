//! Error types shared by the control, its adapters and event handlers.

use thiserror::Error;

/// Boxed error produced by application handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the canvas control and the services it calls into.
#[derive(Error, Debug)]
pub enum CanvasError {
    /// The adapter could not create a graphics device.
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    /// The graphics device stopped responding and must be recreated.
    #[error("device lost: {0}")]
    DeviceLost(String),

    /// The device was requested before one was created.
    #[error("no device has been created yet")]
    NoDevice,

    /// The adapter could not create an image surface of the requested size.
    #[error("surface creation failed at {width}x{height}: {reason}")]
    SurfaceCreation {
        width: u32,
        height: u32,
        reason: String,
    },

    /// A drawing session could not be opened or used.
    #[error("drawing session error: {0}")]
    DrawingSession(String),

    /// Registering the per-frame rendering callback failed.
    #[error("rendering callback registration failed: {0}")]
    RenderingCallback(String),

    /// The host could not create the base control or the image control.
    #[error("element creation failed: {0}")]
    ElementCreation(String),

    /// An application handler failed.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),
}

impl CanvasError {
    /// Wraps an arbitrary handler error.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        CanvasError::Handler(err.into())
    }

    pub fn is_device_lost(&self) -> bool {
        matches!(self, CanvasError::DeviceLost(_))
    }
}

pub type Result<T, E = CanvasError> = std::result::Result<T, E>;
