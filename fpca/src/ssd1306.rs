//! SSD1306 OLED controller on I2C.
//!
//! Every transfer starts with a control byte saying what follows: a command
//! stream, one data byte, or a stream of data for GDDRAM. GDDRAM is organised
//! as pages of 8 pixel rows, one byte per column per page, which makes 8x8
//! character cells fall out naturally: one page is one text line and eight
//! column bytes are one glyph.

use embedded_hal::i2c::{I2c, Operation, SevenBitAddress};

use crate::font::{self, CELL_WIDTH};
use crate::terminal::Terminal;

/// `0x78` once shifted into a write address byte.
pub const ADDRESS: SevenBitAddress = 0x3C;

pub const COLUMNS: u8 = 128;
/// Character cells per line.
pub const TEXT_COLUMNS: u8 = COLUMNS / CELL_WIDTH as u8;
/// 128x64 panels; 128x32 ones have 4.
pub const DEFAULT_PAGES: u8 = 8;

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0xC0;
const CONTROL_DATA_CONTINUOUS: u8 = 0x40;

const CMD_ADDRESS_MODE: u8 = 0x20;
const CMD_COLUMN_RANGE: u8 = 0x21;
const CMD_PAGE_RANGE: u8 = 0x22;
const CMD_CHARGE_PUMP: u8 = 0x8D;
const CHARGE_PUMP_ON: u8 = 0x14;
const CMD_RESUME_RAM: u8 = 0xA4;
const CMD_ENTIRE_ON: u8 = 0xA5;
const CMD_DISPLAY_OFF: u8 = 0xAE;
const CMD_DISPLAY_ON: u8 = 0xAF;

/// How the GDDRAM pointer moves after each data byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum AddressMode {
    /// Along the column range, then on to the next page.
    Horizontal = 0,
    /// Down the page range, then on to the next column.
    Vertical = 1,
    /// Along the page only, wrapping to its start.
    Page = 2,
}

pub struct Ssd1306<I> {
    i2c: I,
    pages: u8,
}

impl<I: I2c> Ssd1306<I> {
    pub fn new(i2c: I) -> Self {
        Self::with_pages(i2c, DEFAULT_PAGES)
    }

    pub fn with_pages(i2c: I, pages: u8) -> Self {
        assert!(pages > 0 && pages <= DEFAULT_PAGES);
        Self { i2c, pages }
    }

    pub fn release(self) -> I {
        self.i2c
    }

    pub fn pages(&self) -> u8 {
        self.pages
    }

    fn commands(&mut self, cmds: &[u8]) -> Result<(), I::Error> {
        self.i2c.transaction(
            ADDRESS,
            &mut [Operation::Write(&[CONTROL_COMMAND]), Operation::Write(cmds)],
        )
    }

    /// Charge pump on, then display on. The rest of the power-on defaults
    /// suit a 128x64 panel.
    pub fn init(&mut self) -> Result<(), I::Error> {
        self.commands(&[CMD_CHARGE_PUMP, CHARGE_PUMP_ON])?;
        self.commands(&[CMD_DISPLAY_ON])
    }

    pub fn sleep(&mut self) -> Result<(), I::Error> {
        self.commands(&[CMD_DISPLAY_OFF])
    }

    /// Lights every pixel regardless of GDDRAM.
    pub fn whole_display_on(&mut self) -> Result<(), I::Error> {
        self.commands(&[CMD_ENTIRE_ON])
    }

    /// Undoes `whole_display_on`.
    pub fn resume_ram_content(&mut self) -> Result<(), I::Error> {
        self.commands(&[CMD_RESUME_RAM])
    }

    pub fn set_address_mode(&mut self, mode: AddressMode) -> Result<(), I::Error> {
        self.commands(&[CMD_ADDRESS_MODE, mode as u8])
    }

    /// Inclusive; applies to horizontal and vertical modes.
    pub fn set_page_range(&mut self, start: u8, end: u8) -> Result<(), I::Error> {
        self.commands(&[CMD_PAGE_RANGE, start, end])
    }

    /// Inclusive; applies to horizontal and vertical modes.
    pub fn set_column_range(&mut self, start: u8, end: u8) -> Result<(), I::Error> {
        self.commands(&[CMD_COLUMN_RANGE, start, end])
    }

    pub fn write_gram_byte(&mut self, d: u8) -> Result<(), I::Error> {
        self.i2c.write(ADDRESS, &[CONTROL_DATA, d])
    }

    /// `d`, `n` times, as one data stream.
    pub fn write_gram_bytes(&mut self, d: u8, n: u8) -> Result<(), I::Error> {
        let mut buf = [d; 1 + u8::MAX as usize];
        buf[0] = CONTROL_DATA_CONTINUOUS;
        self.i2c.write(ADDRESS, &buf[..=usize::from(n)])
    }

    pub fn write_gram(&mut self, data: &[u8]) -> Result<(), I::Error> {
        self.i2c.transaction(
            ADDRESS,
            &mut [Operation::Write(&[CONTROL_DATA_CONTINUOUS]), Operation::Write(data)],
        )
    }

    /// Sets every byte of GDDRAM to `d`.
    pub fn fill(&mut self, d: u8) -> Result<(), I::Error> {
        self.set_address_mode(AddressMode::Horizontal)?;
        self.set_column_range(0, COLUMNS - 1)?;
        self.set_page_range(0, self.pages - 1)?;
        for _ in 0..self.pages {
            self.write_gram_bytes(d, COLUMNS)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), I::Error> {
        self.fill(0)
    }

    /// Points GDDRAM at character cell (`col`, `row`), clamped to the
    /// panel; later glyphs run on from there.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), I::Error> {
        let col = col.min(TEXT_COLUMNS - 1);
        let row = row.min(self.pages - 1);
        self.set_address_mode(AddressMode::Horizontal)?;
        self.set_column_range(col * CELL_WIDTH as u8, COLUMNS - 1)?;
        self.set_page_range(row, self.pages - 1)
    }

    pub fn write_glyph(&mut self, c: u8) -> Result<(), I::Error> {
        self.write_gram(&font::glyph(c))
    }

    pub fn write_solid_char(&mut self) -> Result<(), I::Error> {
        self.write_gram(&font::SOLID)
    }

    /// Redraws the display from a terminal buffer, top line first. Rows and
    /// columns that don't fit are left out.
    pub fn refresh<const W: usize, const H: usize>(&mut self, t: &Terminal<W, H>) -> Result<(), I::Error> {
        let cols = W.min(usize::from(TEXT_COLUMNS));
        for (row, line) in t.rows().take(usize::from(self.pages)).enumerate() {
            self.set_cursor(0, row as u8)?;
            for &c in &line[..cols] {
                self.write_glyph(c)?;
            }
            // Blank the rest of the line on narrow terminals.
            let rest = (usize::from(TEXT_COLUMNS) - cols) * CELL_WIDTH;
            if rest > 0 {
                self.write_gram_bytes(0, rest as u8)?;
            }
        }
        Ok(())
    }
}

/// Text written straight to the display, with a cursor but no buffer.
///
/// The cursor wraps to the next line at the end of one, and back to the top
/// after the last page, overwriting what was there.
pub struct OledText<I> {
    oled: Ssd1306<I>,
    x: u8,
    y: u8,
}

impl<I: I2c> OledText<I> {
    pub fn new(oled: Ssd1306<I>) -> Self {
        Self { oled, x: 0, y: 0 }
    }

    pub fn release(self) -> Ssd1306<I> {
        self.oled
    }

    pub fn display(&mut self) -> &mut Ssd1306<I> {
        &mut self.oled
    }

    pub fn cursor(&self) -> (u8, u8) {
        (self.x, self.y)
    }

    fn next_line(&mut self) {
        self.y = (self.y + 1) % self.oled.pages();
    }

    pub fn putc(&mut self, c: u8) -> Result<(), I::Error> {
        match c {
            b'\n' => self.newline(),
            b'\r' => self.carriage_return(),
            _ => {
                self.oled.set_cursor(self.x, self.y)?;
                self.oled.write_glyph(c)?;
                self.x += 1;
                if self.x == TEXT_COLUMNS {
                    self.x = 0;
                    self.next_line();
                }
                Ok(())
            }
        }
    }

    pub fn puts(&mut self, s: &str) -> Result<(), I::Error> {
        s.bytes().try_for_each(|b| self.putc(b))
    }

    /// Start of the next line. Nothing is sent to the display.
    pub fn newline(&mut self) -> Result<(), I::Error> {
        self.x = 0;
        self.next_line();
        Ok(())
    }

    pub fn carriage_return(&mut self) -> Result<(), I::Error> {
        self.x = 0;
        Ok(())
    }

    /// Blanks the cursor's line and returns to its start.
    pub fn clear_line(&mut self) -> Result<(), I::Error> {
        self.x = 0;
        self.oled.set_cursor(0, self.y)?;
        self.oled.write_gram_bytes(0, COLUMNS)
    }
}

impl<I: I2c> ufmt::uWrite for OledText<I> {
    type Error = I::Error;

    fn write_str(&mut self, s: &str) -> Result<(), I::Error> {
        self.puts(s)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use embedded_hal::i2c::ErrorType;

    use super::*;
    use crate::i2c::testing::{decode, traced_bus, Frame};

    /// Records the bytes of each transaction.
    #[derive(Default)]
    struct Recorder {
        transfers: Vec<Vec<u8>>,
    }

    impl ErrorType for Recorder {
        type Error = Infallible;
    }

    impl I2c for Recorder {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Infallible> {
            assert_eq!(address, ADDRESS);
            let mut bytes = vec![];
            for op in operations.iter() {
                match op {
                    Operation::Write(b) => bytes.extend_from_slice(b),
                    Operation::Read(_) => panic!("read from a write-only display"),
                }
            }
            self.transfers.push(bytes);
            Ok(())
        }
    }

    fn recorded() -> Ssd1306<Recorder> {
        Ssd1306::new(Recorder::default())
    }

    #[test]
    fn init_on_the_wire() {
        let (bus, trace) = traced_bus();
        let mut oled = Ssd1306::new(bus);
        oled.init().unwrap();
        let frames = decode(&trace.borrow());
        assert_eq!(
            frames,
            vec![
                Frame::Start,
                Frame::Byte(0x78, true),
                Frame::Byte(0x00, true),
                Frame::Byte(0x8D, true),
                Frame::Byte(0x14, true),
                Frame::Stop,
                Frame::Start,
                Frame::Byte(0x78, true),
                Frame::Byte(0x00, true),
                Frame::Byte(0xAF, true),
                Frame::Stop,
            ]
        );
    }

    #[test]
    fn simple_commands() {
        let mut oled = recorded();
        oled.sleep().unwrap();
        oled.whole_display_on().unwrap();
        oled.resume_ram_content().unwrap();
        oled.set_address_mode(AddressMode::Page).unwrap();
        oled.set_page_range(1, 3).unwrap();
        oled.set_column_range(8, 127).unwrap();
        assert_eq!(
            oled.release().transfers,
            vec![
                vec![0x00, 0xAE],
                vec![0x00, 0xA5],
                vec![0x00, 0xA4],
                vec![0x00, 0x20, 0x02],
                vec![0x00, 0x22, 1, 3],
                vec![0x00, 0x21, 8, 127],
            ]
        );
    }

    #[test]
    fn gram_writes() {
        let mut oled = recorded();
        oled.write_gram_byte(0x81).unwrap();
        oled.write_gram_bytes(0xFF, 3).unwrap();
        oled.write_gram_bytes(0xFF, 0).unwrap();
        oled.write_gram(&[1, 2]).unwrap();
        assert_eq!(
            oled.release().transfers,
            vec![vec![0xC0, 0x81], vec![0x40, 0xFF, 0xFF, 0xFF], vec![0x40], vec![0x40, 1, 2]]
        );
    }

    #[test]
    fn fill_covers_every_page() {
        let mut oled = Ssd1306::with_pages(Recorder::default(), 4);
        oled.clear().unwrap();
        let t = oled.release().transfers;
        assert_eq!(t[..3], [vec![0x00, 0x20, 0x00], vec![0x00, 0x21, 0, 127], vec![0x00, 0x22, 0, 3]]);
        assert_eq!(t.len(), 3 + 4);
        for page in &t[3..] {
            assert_eq!(page.len(), 1 + 128);
            assert!(page[1..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn glyphs() {
        let mut oled = recorded();
        oled.set_cursor(2, 5).unwrap();
        oled.write_glyph(b'!').unwrap();
        oled.write_solid_char().unwrap();
        let t = oled.release().transfers;
        assert_eq!(t[1], vec![0x00, 0x21, 16, 127]);
        assert_eq!(t[2], vec![0x00, 0x22, 5, 7]);
        let mut expected = vec![0x40];
        expected.extend_from_slice(&font::glyph(b'!'));
        assert_eq!(t[3], expected);
        assert_eq!(t[4][1..], font::SOLID);
    }

    #[test]
    fn cursor_clamped_to_panel() {
        let mut oled = Ssd1306::with_pages(Recorder::default(), 4);
        oled.set_cursor(40, 9).unwrap();
        let t = oled.release().transfers;
        assert_eq!(t[1], vec![0x00, 0x21, 120, 127]);
        assert_eq!(t[2], vec![0x00, 0x22, 3, 3]);
    }

    #[test]
    fn refresh_from_terminal() {
        let mut term: Terminal<4, 10> = Terminal::new();
        term.write_str("ab");
        let mut oled = Ssd1306::with_pages(Recorder::default(), 4);
        oled.refresh(&term).unwrap();
        let t = oled.release().transfers;
        // Per row: three cursor commands, four glyphs, then blanking.
        assert_eq!(t.len(), 4 * (3 + 4 + 1));
        assert_eq!(t[3][1..], font::glyph(b'a'));
        assert_eq!(t[4][1..], font::glyph(b'b'));
        assert_eq!(t[5][1..], font::glyph(0));
        assert_eq!(t[7].len(), 1 + (16 - 4) * 8);
        assert_eq!(t[8 + 2], vec![0x00, 0x22, 1, 3]);
    }

    #[test]
    fn text_cursor_wraps() {
        let mut text = OledText::new(Ssd1306::with_pages(Recorder::default(), 2));
        for _ in 0..TEXT_COLUMNS {
            text.putc(b'x').unwrap();
        }
        assert_eq!(text.cursor(), (0, 1));
        text.puts("hi\r").unwrap();
        assert_eq!(text.cursor(), (0, 1));
        text.puts("\n").unwrap();
        assert_eq!(text.cursor(), (0, 0));
        // Each glyph repositions the cursor before drawing.
        assert_eq!(text.release().release().transfers.len(), (16 + 2) * 4);
    }

    #[test]
    fn clear_line_blanks_a_page() {
        let mut text = OledText::new(recorded());
        text.puts("ab\nc").unwrap();
        text.clear_line().unwrap();
        assert_eq!(text.cursor(), (0, 1));
        let t = text.release().release().transfers;
        let n = t.len();
        assert_eq!(t[n - 2], vec![0x00, 0x22, 1, 7]);
        assert_eq!(t[n - 1].len(), 1 + 128);
    }

    #[test]
    fn formatted_text() {
        let mut text = OledText::new(recorded());
        ufmt::uwrite!(text, "{}", 42u8).unwrap();
        assert_eq!(text.cursor(), (2, 0));
    }
}
