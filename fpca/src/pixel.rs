//! 640x480 true-colour framebuffer in the Pynq-Z2's DDR.
//!
//! Pixels are 32-bit words holding 24-bit RGB. Rows are padded to 4096 bytes
//! so that the address is a shift rather than a multiply.

use crate::reg::Reg;

pub const PIXELS_X: usize = 640;
pub const PIXELS_Y: usize = 480;
const CLOG2_ROW_BYTES: usize = 12;

pub const BLACK: u32 = 0x0000_0000;
pub const RED: u32 = 0x00FF_0000;
pub const GREEN: u32 = 0x0000_FF00;
pub const BLUE: u32 = 0x0000_00FF;
pub const YELLOW: u32 = 0x00FF_FF00;
pub const MAGENTA: u32 = 0x00FF_00FF;
pub const CYAN: u32 = 0x0000_FFFF;
pub const WHITE: u32 = 0x00FF_FFFF;
pub const GREY: u32 = 0x0080_8080;

/// Byte offset of pixel (x, y) from the start of the framebuffer.
pub fn offset(x: usize, y: usize) -> usize {
    x * 4 + (y << CLOG2_ROW_BYTES)
}

pub struct PixelDisplay {
    base: usize,
}

impl PixelDisplay {
    /// Bytes of memory a framebuffer occupies, padding included.
    pub const SIZE: usize = PIXELS_Y << CLOG2_ROW_BYTES;

    /// # Safety
    ///
    /// `base` must be the start of `SIZE` bytes of word-aligned memory that
    /// nothing else is using.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub fn address(&self, x: usize, y: usize) -> usize {
        self.base + offset(x, y)
    }

    /// Sets one pixel. Coordinates off the screen are ignored.
    pub fn set(&mut self, x: usize, y: usize, colour: u32) {
        if x >= PIXELS_X || y >= PIXELS_Y {
            return;
        }
        // Safety: in bounds, so within the region promised to `new`.
        unsafe { Reg::at(self.address(x, y)) }.write(colour);
    }

    pub fn clear(&mut self, colour: u32) {
        for y in 0..PIXELS_Y {
            for x in 0..PIXELS_X {
                self.set(x, y, colour);
            }
        }
    }
}
