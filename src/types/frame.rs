//! Frame: an RGB pixel buffer addressed by row/column

use serde::{Deserialize, Serialize};

/// One pixel, red/green/blue channel order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Convert to HSV on the OpenCV 8-bit scale (H 0-180, S and V 0-255)
    pub fn to_hsv(self) -> Hsv {
        let (r, g, b) = (self.0 as i32, self.1 as i32, self.2 as i32);
        let v = r.max(g).max(b);
        let min = r.min(g).min(b);
        let diff = v - min;

        let s = if v == 0 { 0 } else { (255 * diff + v / 2) / v };

        let h = if diff == 0 {
            0.0
        } else {
            let diff = diff as f64;
            let mut h = if v == r {
                60.0 * (g - b) as f64 / diff
            } else if v == g {
                120.0 + 60.0 * (b - r) as f64 / diff
            } else {
                240.0 + 60.0 * (r - g) as f64 / diff
            };
            if h < 0.0 {
                h += 360.0;
            }
            h
        };

        Hsv {
            h: (h / 2.0).round() as u8,
            s: s as u8,
            v: v as u8,
        }
    }
}

/// HSV triple on the OpenCV 8-bit scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

/// Rectangular color image
///
/// The core only reads frames; they are never kept past the tick that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Frame {
    /// Frame filled with one color
    pub fn filled(width: usize, height: usize, color: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    /// Build from row-major pixels; `None` if the length does not match
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Rgb>) -> Option<Self> {
        if pixels.len() != width * height {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel at (row, col); panics when out of bounds
    pub fn pixel(&self, row: usize, col: usize) -> Rgb {
        self.pixels[row * self.width + col]
    }

    pub fn set_pixel(&mut self, row: usize, col: usize, color: Rgb) {
        self.pixels[row * self.width + col] = color;
    }

    /// Fill the half-open rectangle [top, bottom) x [left, right)
    pub fn fill_rect(&mut self, top: usize, left: usize, bottom: usize, right: usize, color: Rgb) {
        let bottom = bottom.min(self.height);
        let right = right.min(self.width);
        for row in top..bottom {
            for col in left..right {
                self.set_pixel(row, col, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_colors_to_hsv() {
        assert_eq!(Rgb(0, 255, 0).to_hsv(), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(Rgb(255, 0, 0).to_hsv(), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(Rgb(0, 255, 255).to_hsv(), Hsv { h: 90, s: 255, v: 255 });
    }

    #[test]
    fn test_gray_has_no_saturation() {
        let hsv = Rgb(128, 128, 128).to_hsv();
        assert_eq!(hsv.s, 0);
        assert_eq!(hsv.v, 128);
    }

    #[test]
    fn test_magenta_red_wraps_high() {
        // Slightly blue red sits near the top of the hue range
        let hsv = Rgb(255, 0, 20).to_hsv();
        assert!(hsv.h >= 170, "hue {}", hsv.h);
    }

    #[test]
    fn test_from_pixels_checks_length() {
        assert!(Frame::from_pixels(2, 2, vec![Rgb::BLACK; 3]).is_none());
        assert!(Frame::from_pixels(2, 2, vec![Rgb::BLACK; 4]).is_some());
    }

    #[test]
    fn test_fill_rect_clamps() {
        let mut frame = Frame::filled(4, 4, Rgb::BLACK);
        frame.fill_rect(2, 2, 10, 10, Rgb::WHITE);
        assert_eq!(frame.pixel(3, 3), Rgb::WHITE);
        assert_eq!(frame.pixel(1, 1), Rgb::BLACK);
    }
}
