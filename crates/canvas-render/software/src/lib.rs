//! CPU rasterizing backend for Canvas-RS.
//!
//! Surfaces are RGBA8 buffers. A drawing session renders into a private back
//! buffer and publishes it to its surface when closed, so readers never observe
//! a half-drawn frame. Hosts copy the presented surface into their window
//! frame with [`SoftwareImageControl::present`].

mod adapter;
mod device;
mod host;
mod image;
mod session;

pub use adapter::SoftwareAdapter;
pub use device::SoftwareDevice;
pub use host::{SoftwareHost, SoftwareImageControl};
pub use image::{copy_to_frame, SoftwareImage};
pub use session::{SoftwareDrawingSession, SoftwareImageSource};

/// Control type produced by this backend.
pub type SoftwareCanvas = canvas_core::CanvasControl<SoftwareAdapter>;
