/// Layout size in device-independent units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns true when either dimension is non-positive (or NaN).
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Converts to whole pixels at the given scale, truncating fractions.
    ///
    /// Negative, NaN and infinite dimensions map to zero.
    pub fn to_pixels(self, scale: f32) -> PixelSize {
        fn truncate(value: f32) -> u32 {
            if value.is_finite() && value > 0.0 {
                value as u32
            } else {
                0
            }
        }
        PixelSize {
            width: truncate(self.width * scale),
            height: truncate(self.height * scale),
        }
    }
}

/// Surface size in whole pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    /// Returns the overlapping area, or `None` when the rectangles do not overlap.
    pub fn intersect(&self, other: Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        if right > left && bottom > top {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_pixels_truncates_and_scales() {
        assert_eq!(Size::new(200.7, 150.2).to_pixels(1.0), PixelSize::new(200, 150));
        assert_eq!(Size::new(100.0, 50.0).to_pixels(1.5), PixelSize::new(150, 75));
    }

    #[test]
    fn to_pixels_clamps_invalid_dimensions() {
        assert_eq!(Size::new(-4.0, f32::NAN).to_pixels(1.0), PixelSize::new(0, 0));
        assert_eq!(Size::new(f32::INFINITY, 10.0).to_pixels(1.0), PixelSize::new(0, 10));
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 5.0, 5.0);
        assert_eq!(a.intersect(b), None);
        assert_eq!(
            a.intersect(Rect::new(5.0, 5.0, 10.0, 10.0)),
            Some(Rect::new(5.0, 5.0, 5.0, 5.0))
        );
    }
}
