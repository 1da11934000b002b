//! 80x30 character-cell VGA display (640x480 with an 8x16 font).
//!
//! Each cell is one word of framebuffer: `(fg << 12) | (bg << 8) | code`,
//! where the colours index the palette in the display's colour RAM.

use crate::reg::Reg;
use crate::terminal::Terminal;

pub const TEXT_W: usize = 80;
pub const TEXT_H: usize = 30;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Colour {
    Black = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
    Yellow = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
    Grey = 8,
}

pub fn cell(code: u8, fg: Colour, bg: Colour) -> u32 {
    (u32::from(fg as u8) << 12) | (u32::from(bg as u8) << 8) | u32::from(code)
}

pub struct TextDisplay {
    base: Reg,
}

impl TextDisplay {
    /// # Safety
    ///
    /// `base` must be the address of a `TEXT_W * TEXT_H` word text
    /// framebuffer.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base: Reg::at(base) }
    }

    /// Sets one cell. Coordinates off the screen are ignored.
    pub fn set(&mut self, x: usize, y: usize, code: u8, fg: Colour, bg: Colour) {
        if x >= TEXT_W || y >= TEXT_H {
            return;
        }
        // Safety: in bounds, checked above.
        let r = unsafe { self.base.offset(y * TEXT_W + x) };
        r.write(cell(code, fg, bg));
    }

    /// Writes `s` starting at (x, y), clipped at the right edge.
    pub fn string(&mut self, x: usize, y: usize, s: &[u8], fg: Colour, bg: Colour) {
        for (i, &c) in s.iter().enumerate() {
            self.set(x + i, y, c, fg, bg);
        }
    }

    /// Fills the rectangle from (x1, y1) to (x2, y2) inclusive with blank
    /// cells of background `colour`.
    pub fn fill(&mut self, x1: usize, y1: usize, x2: usize, y2: usize, colour: Colour) {
        for y in y1..=y2 {
            for x in x1..=x2 {
                self.set(x, y, 0, Colour::Black, colour);
            }
        }
    }

    pub fn clear(&mut self) {
        self.fill(0, 0, TEXT_W - 1, TEXT_H - 1, Colour::Black);
    }

    /// Copies a terminal to the screen, white on black, top line first.
    pub fn refresh_from_terminal<const W: usize, const H: usize>(&mut self, t: &Terminal<W, H>) {
        for (y, row) in t.rows().enumerate() {
            for (x, &c) in row.iter().enumerate() {
                self.set(x, y, c, Colour::White, Colour::Black);
            }
        }
    }
}
