//! Pure math/data for drawing & units in Canvas-RS
//!
//! This crate contains the size, pixel and color types shared by the canvas
//! control, its adapters and the rendering backends.

mod color;
mod geometry;

pub use color::*;
pub use geometry::*;

pub mod prelude {
    pub use crate::color::Color;
    pub use crate::geometry::{PixelSize, Rect, Size};
}
