//! The primary console: a screen-sized terminal shown on the text display.

use core::convert::Infallible;

use crate::terminal::Terminal;
use crate::text::{TextDisplay, TEXT_H, TEXT_W};

pub struct Console {
    term: Terminal<TEXT_W, TEXT_H>,
    display: TextDisplay,
}

impl Console {
    pub const fn new(display: TextDisplay) -> Self {
        Self { term: Terminal::new(), display }
    }

    pub fn terminal(&self) -> &Terminal<TEXT_W, TEXT_H> {
        &self.term
    }

    pub fn display(&mut self) -> &mut TextDisplay {
        &mut self.display
    }

    pub fn refresh(&mut self) {
        self.display.refresh_from_terminal(&self.term);
    }

    /// Writes one character and redraws the screen.
    pub fn putchar(&mut self, c: u8) {
        self.term.write_byte(c);
        self.refresh();
    }

    /// Writes a string, redrawing once at the end.
    pub fn write_str(&mut self, s: &str) {
        self.term.write_str(s);
        self.refresh();
    }

    pub fn cls(&mut self) {
        self.term.clear();
        self.refresh();
    }
}

impl ufmt::uWrite for Console {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        Console::write_str(self, s);
        Ok(())
    }
}
