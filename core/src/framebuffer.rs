use embedded_graphics::pixelcolor::BinaryColor;
use image::{GrayImage, Luma};

/// Packed 1-bit frame in panel order.
///
/// Rows are MSB-first with a stride of `ceil(width / 8)` bytes. A set bit is
/// black ink (`BinaryColor::On`), a cleared bit is white paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoFrame {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl MonoFrame {
    /// Blank (white) frame.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = Self::stride_for(width);
        Self {
            width,
            height,
            bytes: vec![0x00; stride * height as usize],
        }
    }

    /// Packs a thresholded grayscale image; anything darker than mid-gray is ink.
    pub fn from_luma(image: &GrayImage) -> Self {
        let mut frame = Self::new(image.width(), image.height());
        for (x, y, Luma([value])) in image.enumerate_pixels() {
            if *value < 0x80 {
                frame.set_pixel(x as i32, y as i32, BinaryColor::On);
            }
        }
        frame
    }

    fn stride_for(width: u32) -> usize {
        (width as usize).div_ceil(8)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stride(&self) -> usize {
        Self::stride_for(self.width)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bitwise complement of the frame, as sent on the panel's "old data" channel.
    pub fn inverted(&self) -> Vec<u8> {
        self.bytes.iter().map(|b| !b).collect()
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: BinaryColor) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let byte_index = y as usize * self.stride() + x as usize / 8;
        let bit_index = 7 - (x as usize % 8);
        match color {
            BinaryColor::On => self.bytes[byte_index] |= 1 << bit_index,
            BinaryColor::Off => self.bytes[byte_index] &= !(1 << bit_index),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let byte = self.bytes[y as usize * self.stride() + x as usize / 8];
        if byte & (1 << (7 - (x % 8))) != 0 {
            Some(BinaryColor::On)
        } else {
            Some(BinaryColor::Off)
        }
    }

    pub fn ink_count(&self) -> usize {
        let mut count = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixel(x, y) == Some(BinaryColor::On) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Unpacks back to black/white grayscale, for previews.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| match self.pixel(x, y) {
            Some(BinaryColor::On) => Luma([0x00]),
            _ => Luma([0xFF]),
        })
    }
}
