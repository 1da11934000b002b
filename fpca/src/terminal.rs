//! A fixed-size text terminal with circular scrolling.
//!
//! The buffer holds `H` rows of `W` bytes. Rather than copying rows up when
//! the screen scrolls, `line_at_top` records which buffer row is currently the
//! top of the screen; screen row `r` lives in buffer row
//! `(line_at_top + r) % H`. Scrolling is then one increment and clearing one
//! row.
//!
//! Invariants, maintained by every method:
//!
//! - `x < W` and `y < H` (`y` is a screen row, not a buffer row);
//! - `line_at_top < H`.

use core::convert::Infallible;

const TAB_STOP: usize = 8;
const BACKSPACE: u8 = 0x08;

pub struct Terminal<const W: usize, const H: usize> {
    buf: [[u8; W]; H],
    x: usize,
    y: usize,
    line_at_top: usize,
}

impl<const W: usize, const H: usize> Terminal<W, H> {
    pub const fn new() -> Self {
        assert!(W > 0 && H > 0);
        Self {
            buf: [[0; W]; H],
            x: 0,
            y: 0,
            line_at_top: 0,
        }
    }

    pub const fn width(&self) -> usize {
        W
    }

    pub const fn height(&self) -> usize {
        H
    }

    /// Cursor position as (column, screen row).
    pub fn cursor(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Moves the cursor, clamping to the screen.
    pub fn set_cursor(&mut self, x: usize, y: usize) {
        self.x = x.min(W - 1);
        self.y = y.min(H - 1);
    }

    /// Buffer row currently shown at the top of the screen.
    pub fn line_at_top(&self) -> usize {
        self.line_at_top
    }

    fn buffer_row(&self, screen_row: usize) -> usize {
        (self.line_at_top + screen_row) % H
    }

    /// Contents of screen row `r`.
    ///
    /// # Panics
    ///
    /// If `r >= H`.
    pub fn row(&self, r: usize) -> &[u8; W] {
        assert!(r < H);
        &self.buf[self.buffer_row(r)]
    }

    /// Screen rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8; W]> + '_ {
        (0..H).map(move |r| self.row(r))
    }

    pub fn write_byte(&mut self, b: u8) {
        match b {
            b'\n' => self.newline(),
            b'\r' => self.carriage_return(),
            BACKSPACE => self.x = self.x.saturating_sub(1),
            b'\t' => {
                let next = (self.x / TAB_STOP + 1) * TAB_STOP;
                if next >= W {
                    self.newline();
                } else {
                    self.x = next;
                }
            }
            _ => self.put(b),
        }
    }

    /// Writes `s`, substituting `?` for anything outside ASCII.
    pub fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            self.write_byte(if c.is_ascii() { c as u8 } else { b'?' });
        }
    }

    fn put(&mut self, b: u8) {
        let row = self.buffer_row(self.y);
        self.buf[row][self.x] = b;
        self.x += 1;
        if self.x == W {
            self.newline();
        }
    }

    /// Moves to the start of the next line, scrolling if we're on the last.
    pub fn newline(&mut self) {
        self.x = 0;
        if self.y + 1 < H {
            self.y += 1;
        } else {
            self.line_at_top = (self.line_at_top + 1) % H;
            let bottom = self.buffer_row(H - 1);
            self.buf[bottom] = [0; W];
        }
    }

    pub fn carriage_return(&mut self) {
        self.x = 0;
    }

    /// Blanks the cursor's row and returns to its start.
    pub fn clear_line(&mut self) {
        let row = self.buffer_row(self.y);
        self.buf[row] = [0; W];
        self.x = 0;
    }

    pub fn clear(&mut self) {
        self.buf = [[0; W]; H];
        self.x = 0;
        self.y = 0;
        self.line_at_top = 0;
    }
}

impl<const W: usize, const H: usize> Default for Terminal<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize, const H: usize> ufmt::uWrite for Terminal<W, H> {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        Terminal::write_str(self, s);
        Ok(())
    }
}

impl<const W: usize, const H: usize> core::fmt::Write for Terminal<W, H> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        Terminal::write_str(self, s);
        Ok(())
    }
}
