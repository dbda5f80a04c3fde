use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use canvas_core::{CanvasImageSource, DrawingSession, Result};
use canvas_ui_graphics::{Color, PixelSize, Rect, Size};
use parking_lot::Mutex;

use crate::device::SoftwareDevice;
use crate::image::{copy_to_frame, SoftwareImage};

/// Published pixels of one surface.
struct SurfaceBuffer {
    pixels: Mutex<Vec<u8>>,
    presents: AtomicU64,
}

/// RGBA8 surface bound to a [`SoftwareDevice`].
pub struct SoftwareImageSource {
    device: Arc<SoftwareDevice>,
    size: PixelSize,
    buffer: Arc<SurfaceBuffer>,
}

impl SoftwareImageSource {
    pub(crate) fn new(device: Arc<SoftwareDevice>, size: PixelSize) -> Self {
        Self {
            device,
            size,
            buffer: Arc::new(SurfaceBuffer {
                pixels: Mutex::new(vec![0; size.area() * 4]),
                presents: AtomicU64::new(0),
            }),
        }
    }

    pub fn device(&self) -> &Arc<SoftwareDevice> {
        &self.device
    }

    /// Copies the last published frame.
    pub fn snapshot(&self) -> SoftwareImage {
        SoftwareImage::new(self.size, self.buffer.pixels.lock().clone())
    }

    /// Number of sessions that published into this surface.
    pub fn present_count(&self) -> u64 {
        self.buffer.presents.load(Ordering::SeqCst)
    }

    /// Copies the last published frame into a host frame buffer.
    pub fn copy_to_frame(&self, frame: &mut [u8], frame_size: PixelSize) {
        let pixels = self.buffer.pixels.lock();
        copy_to_frame(&pixels, self.size, frame, frame_size);
    }
}

impl CanvasImageSource for SoftwareImageSource {
    type DrawingSession = SoftwareDrawingSession;

    fn create_drawing_session(&self, clear_color: Color) -> Result<SoftwareDrawingSession> {
        self.device.ensure_alive()?;
        let mut session = SoftwareDrawingSession {
            device: Arc::clone(&self.device),
            size: self.size,
            back: vec![0; self.size.area() * 4],
            target: Arc::clone(&self.buffer),
        };
        session.clear(clear_color);
        Ok(session)
    }

    fn size(&self) -> PixelSize {
        self.size
    }
}

impl fmt::Debug for SoftwareImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareImageSource")
            .field("device", &self.device.id())
            .field("size", &self.size)
            .field("presents", &self.present_count())
            .finish()
    }
}

/// Immediate-mode rasterizer over a private back buffer.
///
/// Coordinates are in surface pixels; colors blend source-over.
pub struct SoftwareDrawingSession {
    device: Arc<SoftwareDevice>,
    size: PixelSize,
    back: Vec<u8>,
    target: Arc<SurfaceBuffer>,
}

impl SoftwareDrawingSession {
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Replaces every pixel with `color`.
    pub fn clear(&mut self, color: Color) {
        let rgba = color.to_rgba8();
        for px in self.back.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let bounds = Rect::from_size(Size::new(self.size.width as f32, self.size.height as f32));
        let Some(clipped) = bounds.intersect(rect) else {
            return;
        };
        let (Some((x0, x1)), Some((y0, y1))) = (
            span(clipped.x, clipped.width),
            span(clipped.y, clipped.height),
        ) else {
            return;
        };
        let rgba = color.to_rgba8();
        let stride = self.size.width as usize * 4;
        for row in self.back.chunks_exact_mut(stride).take(y1).skip(y0) {
            for px in row[x0 * 4..x1 * 4].chunks_exact_mut(4) {
                blend(px, rgba);
            }
        }
    }

    /// Outlines `rect` with a border of `stroke_width` drawn inside it.
    pub fn stroke_rect(&mut self, rect: Rect, stroke_width: f32, color: Color) {
        if !(stroke_width > 0.0) {
            return;
        }
        let stroke = stroke_width.min(rect.width / 2.0).min(rect.height / 2.0);
        let inner_height = rect.height - 2.0 * stroke;
        self.fill_rect(Rect::new(rect.x, rect.y, rect.width, stroke), color);
        self.fill_rect(
            Rect::new(rect.x, rect.y + rect.height - stroke, rect.width, stroke),
            color,
        );
        if inner_height > 0.0 {
            self.fill_rect(Rect::new(rect.x, rect.y + stroke, stroke, inner_height), color);
            self.fill_rect(
                Rect::new(rect.x + rect.width - stroke, rect.y + stroke, stroke, inner_height),
                color,
            );
        }
    }
}

impl DrawingSession for SoftwareDrawingSession {
    /// Publishes the back buffer to the surface. Fails without publishing when
    /// the device was removed while drawing.
    fn close(&mut self) -> Result<()> {
        self.device.ensure_alive()?;
        std::mem::swap(&mut *self.target.pixels.lock(), &mut self.back);
        self.target.presents.fetch_add(1, Ordering::SeqCst);
        log::trace!(
            "software surface {}x{} presented",
            self.size.width,
            self.size.height
        );
        Ok(())
    }
}

impl fmt::Debug for SoftwareDrawingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareDrawingSession")
            .field("size", &self.size)
            .finish()
    }
}

/// Rounds a clipped extent to whole pixel indices `[start, end)`.
fn span(start: f32, extent: f32) -> Option<(usize, usize)> {
    let lo = start.round();
    let hi = (start + extent).round();
    if hi > lo && lo >= 0.0 {
        Some((lo as usize, hi as usize))
    } else {
        None
    }
}

fn blend(dst: &mut [u8], src: [u8; 4]) {
    let alpha = src[3] as u32;
    match alpha {
        0 => {}
        255 => dst.copy_from_slice(&src),
        _ => {
            let inverse = 255 - alpha;
            for channel in 0..3 {
                dst[channel] =
                    ((src[channel] as u32 * alpha + dst[channel] as u32 * inverse + 127) / 255) as u8;
            }
            dst[3] = (alpha + (dst[3] as u32 * inverse + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn surface(width: u32, height: u32) -> SoftwareImageSource {
        SoftwareImageSource::new(Arc::new(SoftwareDevice::new()), PixelSize::new(width, height))
    }

    #[test]
    fn drawing_is_published_only_on_close() {
        let source = surface(4, 4);
        let mut session = source.create_drawing_session(Color::BLACK).unwrap();
        session.fill_rect(Rect::new(1.0, 1.0, 2.0, 2.0), Color::WHITE);
        assert_eq!(source.snapshot().pixel(1, 1), Some([0, 0, 0, 0]));

        session.close().unwrap();
        let image = source.snapshot();
        assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(image.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(2, 2), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(3, 3), Some([0, 0, 0, 255]));
        assert_eq!(source.present_count(), 1);
    }

    #[test]
    fn fill_is_clipped_to_surface() {
        let source = surface(3, 3);
        let mut session = source.create_drawing_session(Color::TRANSPARENT).unwrap();
        session.fill_rect(Rect::new(-5.0, 2.0, 100.0, 100.0), Color::WHITE);
        session.fill_rect(Rect::new(10.0, 10.0, 1.0, 1.0), Color::WHITE);
        session.close().unwrap();

        let image = source.snapshot();
        assert_eq!(image.pixel(0, 2), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(2, 2), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(0, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn translucent_fill_blends_over_background() {
        let source = surface(1, 1);
        let mut session = source.create_drawing_session(Color::BLACK).unwrap();
        session.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE.with_alpha(0.5));
        session.close().unwrap();
        assert_eq!(source.snapshot().pixel(0, 0), Some([128, 128, 128, 255]));
    }

    #[test]
    fn stroke_leaves_interior_untouched() {
        let source = surface(5, 5);
        let mut session = source.create_drawing_session(Color::TRANSPARENT).unwrap();
        session.stroke_rect(Rect::new(0.0, 0.0, 5.0, 5.0), 1.0, Color::WHITE);
        session.close().unwrap();

        let image = source.snapshot();
        assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(4, 2), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(2, 4), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn lost_device_fails_session_without_publishing() {
        let source = surface(2, 2);
        let mut session = source.create_drawing_session(Color::WHITE).unwrap();
        source.device().mark_lost();

        assert!(session.close().unwrap_err().is_device_lost());
        assert_eq!(source.present_count(), 0);
        assert!(source
            .create_drawing_session(Color::WHITE)
            .unwrap_err()
            .is_device_lost());
    }
}
