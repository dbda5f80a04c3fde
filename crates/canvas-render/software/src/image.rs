use canvas_ui_graphics::PixelSize;

const BYTES_PER_PIXEL: usize = 4;

/// Owned copy of a surface's published pixels, row-major RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoftwareImage {
    size: PixelSize,
    pixels: Vec<u8>,
}

impl SoftwareImage {
    pub(crate) fn new(size: PixelSize, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), size.area() * BYTES_PER_PIXEL);
        Self { size, pixels }
    }

    pub fn size(&self) -> PixelSize {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the RGBA value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let offset = (y as usize * self.size.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = self.pixels.get(offset..offset + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn copy_to_frame(&self, frame: &mut [u8], frame_size: PixelSize) {
        copy_to_frame(&self.pixels, self.size, frame, frame_size);
    }
}

/// Copies `source` into the top-left corner of `frame`, clipping to whichever
/// is smaller. Frame pixels outside the copied area are left untouched.
pub fn copy_to_frame(source: &[u8], source_size: PixelSize, frame: &mut [u8], frame_size: PixelSize) {
    let frame_stride = frame_size.width as usize * BYTES_PER_PIXEL;
    let source_stride = source_size.width as usize * BYTES_PER_PIXEL;
    if frame_stride == 0 || source_stride == 0 {
        return;
    }
    let row_bytes = frame_stride.min(source_stride);
    let rows = (source_size.height.min(frame_size.height) as usize)
        .min(frame.len() / frame_stride)
        .min(source.len() / source_stride);

    for (dst, src) in frame
        .chunks_exact_mut(frame_stride)
        .zip(source.chunks_exact(source_stride))
        .take(rows)
    {
        dst[..row_bytes].copy_from_slice(&src[..row_bytes]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(size: PixelSize, rgba: [u8; 4]) -> Vec<u8> {
        rgba.iter()
            .copied()
            .cycle()
            .take(size.area() * BYTES_PER_PIXEL)
            .collect()
    }

    #[test]
    fn copy_clips_to_smaller_frame() {
        let source_size = PixelSize::new(4, 4);
        let source = solid(source_size, [9, 8, 7, 255]);
        let frame_size = PixelSize::new(2, 3);
        let mut frame = vec![0u8; frame_size.area() * BYTES_PER_PIXEL];

        copy_to_frame(&source, source_size, &mut frame, frame_size);
        assert!(frame.chunks_exact(4).all(|px| px == [9, 8, 7, 255]));
    }

    #[test]
    fn copy_leaves_area_outside_source_untouched() {
        let source_size = PixelSize::new(1, 1);
        let image = SoftwareImage::new(source_size, vec![1, 2, 3, 4]);
        let frame_size = PixelSize::new(2, 2);
        let mut frame = vec![0u8; frame_size.area() * BYTES_PER_PIXEL];

        image.copy_to_frame(&mut frame, frame_size);
        assert_eq!(&frame[..4], &[1, 2, 3, 4]);
        assert!(frame[4..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn pixel_outside_image_is_none() {
        let image = SoftwareImage::new(PixelSize::new(2, 1), vec![0; 8]);
        assert_eq!(image.pixel(1, 0), Some([0, 0, 0, 0]));
        assert_eq!(image.pixel(2, 0), None);
        assert_eq!(image.pixel(0, 1), None);
    }
}
